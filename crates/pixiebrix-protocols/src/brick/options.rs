//! Options handed to a brick when it runs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::logger::Logger;
use crate::platform::PlatformProtocol;
use crate::types::Endpoint;

/// Opaque handle to the DOM element a root-aware brick operates on.
///
/// Handles are only meaningful inside the realm that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRoot(pub String);

impl ElementRoot {
    /// The document itself.
    pub fn document() -> Self {
        Self("document".to_string())
    }
}

/// Where a brick is being asked to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub endpoint: Endpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PageContext {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint, url: None }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Everything a brick receives besides its rendered input.
#[derive(Clone)]
pub struct BrickOptions {
    /// Snapshot of the run context (`@input`, `@options` and step outputs).
    pub ctx: serde_json::Value,

    /// Root element, only supplied to root-aware bricks.
    pub root: Option<ElementRoot>,

    /// Run this brick belongs to.
    pub run_id: String,

    /// Page the brick runs in.
    pub page: PageContext,

    /// Structured log sink.
    pub logger: Arc<dyn Logger>,

    /// Host capabilities, when the context provides any.
    pub platform: Option<Arc<dyn PlatformProtocol>>,
}

impl std::fmt::Debug for BrickOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrickOptions")
            .field("ctx", &self.ctx)
            .field("root", &self.root)
            .field("run_id", &self.run_id)
            .field("page", &self.page)
            .finish_non_exhaustive()
    }
}
