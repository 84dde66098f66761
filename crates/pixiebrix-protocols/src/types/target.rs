//! Abstract call targets.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::context::{FrameId, TabId};

/// Abstract descriptor naming who should handle a call.
///
/// Targets are resolved to concrete endpoints fresh on every call, since
/// frames appear and disappear between calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Target {
    /// The calling realm itself; no message is sent.
    This,
    /// The background realm.
    Background,
    /// One frame of a tab. A missing frame id means the top frame.
    Tab {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        frame_id: Option<FrameId>,
    },
    /// The top-level frame of a tab.
    TopFrameOfTab { tab_id: TabId },
    /// Every frame currently known for a tab.
    BroadcastToTab { tab_id: TabId },
    /// An extension page (sidebar, devtools panel, options, ephemeral panel).
    Page { name: String },
}

impl Target {
    pub fn tab(tab_id: TabId, frame_id: FrameId) -> Self {
        Self::Tab {
            tab_id,
            frame_id: Some(frame_id),
        }
    }

    pub fn page(name: impl Into<String>) -> Self {
        Self::Page { name: name.into() }
    }

    pub fn is_broadcast(&self) -> bool {
        matches!(self, Target::BroadcastToTab { .. })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::This => f.write_str("this context"),
            Target::Background => f.write_str("background"),
            Target::Tab {
                tab_id,
                frame_id: Some(frame_id),
            } => write!(f, "tab {} frame {}", tab_id, frame_id),
            Target::Tab {
                tab_id,
                frame_id: None,
            } => write!(f, "tab {}", tab_id),
            Target::TopFrameOfTab { tab_id } => write!(f, "top frame of tab {}", tab_id),
            Target::BroadcastToTab { tab_id } => write!(f, "all frames of tab {}", tab_id),
            Target::Page { name } => write!(f, "page {}", name),
        }
    }
}
