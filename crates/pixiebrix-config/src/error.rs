//! Errors raised while loading or checking a configuration.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Malformed(#[from] toml::de::Error),

    /// A `${VAR}` reference with no such variable in the environment.
    #[error("Config references ${{{0}}}, which is not set")]
    MissingEnvVar(String),

    /// The first problem the validator found.
    #[error("Rejected config setting {setting}: {reason}")]
    Rejected { setting: String, reason: String },
}
