//! Registries for bricks and per-context handlers.

mod base;
mod brick;

pub use base::{BaseRegistry, Registerable};
pub use brick::BrickRegistry;
