//! Error types for the PixieBrix protocol layer.

mod brick;
mod messenger;
mod pipeline;
mod registry;
mod serialized;

pub use brick::*;
pub use messenger::*;
pub use pipeline::*;
pub use registry::*;
pub use serialized::*;
