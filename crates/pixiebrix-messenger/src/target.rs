//! Resolution of abstract targets to concrete endpoints.

use std::sync::Arc;

use pixiebrix_protocols::{Endpoint, FrameId, MessengerError, TOP_FRAME_ID, TabId, Target};
use tracing::trace;

use crate::host::FrameTopology;

/// Outcome of resolving a target from one realm's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Handle the call inside the calling realm.
    Local,
    /// Post to these endpoints. Broadcasts may resolve to none.
    Endpoints(Vec<Endpoint>),
}

impl Resolution {
    fn single(origin: &Endpoint, endpoint: Endpoint) -> Self {
        if &endpoint == origin {
            Resolution::Local
        } else {
            Resolution::Endpoints(vec![endpoint])
        }
    }
}

/// Resolves targets against the live topology. Nothing is cached: frames
/// come and go between calls.
#[derive(Clone)]
pub struct TargetResolver {
    topology: Arc<dyn FrameTopology>,
}

impl TargetResolver {
    pub fn new(topology: Arc<dyn FrameTopology>) -> Self {
        Self { topology }
    }

    pub async fn resolve(
        &self,
        origin: &Endpoint,
        target: &Target,
    ) -> Result<Resolution, MessengerError> {
        let resolution = match target {
            Target::This => Resolution::Local,
            Target::Background => Resolution::single(origin, Endpoint::Background),
            Target::Tab { tab_id, frame_id } => {
                let frame_id = frame_id.unwrap_or(TOP_FRAME_ID);
                Resolution::single(origin, self.frame(*tab_id, frame_id, target).await?)
            }
            Target::TopFrameOfTab { tab_id } => {
                Resolution::single(origin, self.frame(*tab_id, TOP_FRAME_ID, target).await?)
            }
            Target::BroadcastToTab { tab_id } => {
                let mut frames: Vec<FrameId> = self
                    .topology
                    .list_frames(*tab_id)
                    .await
                    .into_iter()
                    .map(|frame| frame.frame_id)
                    .collect();
                frames.sort_unstable();
                frames.dedup();
                Resolution::Endpoints(
                    frames
                        .into_iter()
                        .map(|frame_id| Endpoint::frame(*tab_id, frame_id))
                        .collect(),
                )
            }
            Target::Page { name } => {
                let pages = self.topology.list_pages().await;
                if !pages.iter().any(|page| page == name) {
                    return Err(MessengerError::TargetNotFound(target.to_string()));
                }
                Resolution::single(origin, Endpoint::page(name.clone()))
            }
        };

        trace!(from = %origin, %target, ?resolution, "Resolved target");
        Ok(resolution)
    }

    async fn frame(
        &self,
        tab_id: TabId,
        frame_id: FrameId,
        target: &Target,
    ) -> Result<Endpoint, MessengerError> {
        let frames = self.topology.list_frames(tab_id).await;
        if frames.iter().any(|frame| frame.frame_id == frame_id) {
            Ok(Endpoint::frame(tab_id, frame_id))
        } else {
            Err(MessengerError::TargetNotFound(target.to_string()))
        }
    }
}
