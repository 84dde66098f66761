//! # PixieBrix Protocols
//!
//! Core protocol definitions (traits and plain types) shared by the
//! messenger and the brick runtime. Contains only interface definitions.
//!
//! ## Core Traits
//!
//! - [`Brick`] - A unit of executable automation logic
//! - [`BrickLookup`] - Brick registry capability consumed by the executor
//! - [`Logger`] - Structured diagnostic sink
//! - [`PlatformProtocol`] - Host capability surface available to bricks

pub mod brick;
pub mod error;
pub mod logger;
pub mod platform;
pub mod types;

pub use brick::{
    Brick, BrickDefinition, BrickKind, BrickLookup, BrickOptions, ElementRoot, PageContext,
};
pub use error::{
    BrickError, MessengerError, PipelineError, RegistryError, SerializeError, SerializedError,
};
pub use logger::{LogContext, LogLevel, Logger};
pub use platform::PlatformProtocol;
pub use types::*;
