//! Host capability surface exposed to bricks.

use async_trait::async_trait;

use crate::brick::ElementRoot;
use crate::error::BrickError;

/// Capabilities of the platform a brick runs on (browser extension, page
/// editor preview, headless test harness).
#[async_trait]
pub trait PlatformProtocol: Send + Sync {
    /// Platform name, e.g. `extension`.
    fn platform_name(&self) -> &str;

    /// Show a blocking message to the user.
    async fn alert(&self, message: &str) -> Result<(), BrickError>;

    /// Ask the user to pick an element below `root`.
    async fn select_element(&self, root: Option<&ElementRoot>) -> Result<ElementRoot, BrickError>;
}
