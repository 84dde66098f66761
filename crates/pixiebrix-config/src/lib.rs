//! # PixieBrix Config
//!
//! TOML configuration for the messenger retry policy, the pipeline runtime
//! and logging.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
