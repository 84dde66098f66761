//! Addressing types shared by every execution context.

mod context;
mod target;

pub use context::{ContextKind, Endpoint, FrameId, TabId, TOP_FRAME_ID};
pub use target::Target;
