//! Brick protocol: the unit of automation logic run by pipelines.

mod definition;
mod options;
mod traits;

pub use definition::{BrickDefinition, BrickKind};
pub use options::{BrickOptions, ElementRoot, PageContext};
pub use traits::{Brick, BrickLookup};
