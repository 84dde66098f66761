//! Seams to the host's messaging and tab enumeration primitives.

use std::sync::Arc;

use async_trait::async_trait;
use pixiebrix_protocols::{Endpoint, FrameId, TabId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::envelope::Envelope;

/// Why the host refused to take an envelope.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeliveryError {
    /// Nothing is listening at the endpoint yet. Retried with backoff.
    #[error("Could not establish connection. Receiving end does not exist: {0}")]
    NoReceiver(Endpoint),

    /// The sending realm has been torn down.
    #[error("Extension context invalidated")]
    ContextInvalidated,

    /// The host could not clone the envelope.
    #[error("Could not clone message: {0}")]
    Serialization(String),
}

impl DeliveryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::NoReceiver(_))
    }
}

/// Host primitive for posting envelopes between realms.
///
/// Delivery is unordered and may duplicate. Implementations return once
/// the envelope has been handed off; they never wait for a response.
#[async_trait]
pub trait HostPort: Send + Sync {
    async fn post(&self, to: &Endpoint, envelope: Envelope) -> Result<(), DeliveryError>;

    /// Deliver envelopes addressed to `endpoint` to `listener`.
    fn listen(&self, endpoint: Endpoint, listener: Arc<dyn MessageListener>);

    fn unlisten(&self, endpoint: &Endpoint);
}

/// Receiving side of a realm.
pub trait MessageListener: Send + Sync {
    fn on_message(&self, envelope: Envelope);

    /// The host tore the realm down.
    fn on_context_invalidated(&self);
}

/// A frame as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub frame_id: FrameId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Live enumeration of tabs, frames and extension pages.
#[async_trait]
pub trait FrameTopology: Send + Sync {
    /// Frames currently known for a tab. Unknown tabs have no frames.
    async fn list_frames(&self, tab_id: TabId) -> Vec<FrameInfo>;

    /// Names of the extension pages currently open.
    async fn list_pages(&self) -> Vec<String>;
}
