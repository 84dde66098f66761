//! Execution contexts and concrete transport endpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Browser tab identifier (opaque number handed out by the host).
pub type TabId = u64;

/// Frame identifier within a tab.
pub type FrameId = u64;

/// The host always numbers the top-level frame of a tab as 0.
pub const TOP_FRAME_ID: FrameId = 0;

/// Kind of isolated execution context (realm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContextKind {
    Background,
    ContentScript,
    Sidebar,
    DevTools,
    Options,
    EphemeralPanel,
}

impl ContextKind {
    /// Every context kind, in a stable order.
    pub const ALL: &'static [ContextKind] = &[
        ContextKind::Background,
        ContextKind::ContentScript,
        ContextKind::Sidebar,
        ContextKind::DevTools,
        ContextKind::Options,
        ContextKind::EphemeralPanel,
    ];

    /// Extension pages are addressed by page name rather than tab/frame.
    pub fn is_extension_page(&self) -> bool {
        matches!(
            self,
            ContextKind::Sidebar
                | ContextKind::DevTools
                | ContextKind::Options
                | ContextKind::EphemeralPanel
        )
    }

    /// Whether an endpoint is a valid address for a realm of this kind.
    pub fn accepts(&self, endpoint: &Endpoint) -> bool {
        match endpoint {
            Endpoint::Background => *self == ContextKind::Background,
            Endpoint::Frame { .. } => *self == ContextKind::ContentScript,
            Endpoint::Page { .. } => self.is_extension_page(),
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextKind::Background => "background",
            ContextKind::ContentScript => "contentScript",
            ContextKind::Sidebar => "sidebar",
            ContextKind::DevTools => "devTools",
            ContextKind::Options => "options",
            ContextKind::EphemeralPanel => "ephemeralPanel",
        };
        f.write_str(name)
    }
}

/// A concrete address the host can deliver a message to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Endpoint {
    /// The privileged background realm (one per extension).
    Background,
    /// The content script running in one frame of one tab.
    Frame { tab_id: TabId, frame_id: FrameId },
    /// An extension page such as the sidebar or the devtools panel.
    Page { name: String },
}

impl Endpoint {
    pub fn frame(tab_id: TabId, frame_id: FrameId) -> Self {
        Self::Frame { tab_id, frame_id }
    }

    pub fn page(name: impl Into<String>) -> Self {
        Self::Page { name: name.into() }
    }

    /// Tab this endpoint lives in, if it is a content script.
    pub fn tab_id(&self) -> Option<TabId> {
        match self {
            Endpoint::Frame { tab_id, .. } => Some(*tab_id),
            _ => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Background => f.write_str("background"),
            Endpoint::Frame { tab_id, frame_id } => {
                write!(f, "tab {} frame {}", tab_id, frame_id)
            }
            Endpoint::Page { name } => write!(f, "page {}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_serialization() {
        let endpoint = Endpoint::frame(12, 3);
        let json = serde_json::to_value(&endpoint).unwrap();
        assert_eq!(json, serde_json::json!({"type": "frame", "tabId": 12, "frameId": 3}));

        let parsed: Endpoint = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, endpoint);
    }

    #[test]
    fn test_background_serialization() {
        let json = serde_json::to_string(&Endpoint::Background).unwrap();
        assert_eq!(json, r#"{"type":"background"}"#);
    }

    #[test]
    fn test_context_accepts_endpoint() {
        assert!(ContextKind::Background.accepts(&Endpoint::Background));
        assert!(ContextKind::ContentScript.accepts(&Endpoint::frame(1, 0)));
        assert!(ContextKind::Sidebar.accepts(&Endpoint::page("sidebar")));
        assert!(!ContextKind::Sidebar.accepts(&Endpoint::Background));
        assert!(!ContextKind::ContentScript.accepts(&Endpoint::page("options")));
    }

    #[test]
    fn test_endpoint_tab_id() {
        assert_eq!(Endpoint::frame(7, 2).tab_id(), Some(7));
        assert_eq!(Endpoint::Background.tab_id(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Endpoint::frame(1, 0).to_string(), "tab 1 frame 0");
        assert_eq!(ContextKind::ContentScript.to_string(), "contentScript");
    }
}
