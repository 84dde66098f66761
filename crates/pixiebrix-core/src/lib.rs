//! # PixieBrix Core
//!
//! Registry building blocks.
//!
//! - [`BaseRegistry`] - id-keyed, duplicate-checked storage shared by the
//!   per-context method registry and the brick registry
//! - [`BrickRegistry`] - in-memory brick registry implementing
//!   [`BrickLookup`](pixiebrix_protocols::BrickLookup)

pub mod registry;

pub use registry::{BaseRegistry, BrickRegistry, Registerable};
