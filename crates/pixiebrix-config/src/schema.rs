//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub messenger: MessengerConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Messenger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessengerConfig {
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Readiness retry policy for calls whose receiver is not listening yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Retries after the first attempt. Zero disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    2000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

/// Pipeline runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Fail runs on unavailable bricks instead of skipping them.
    #[serde(default)]
    pub strict_availability: bool,

    /// Validate rendered input against each brick's input schema.
    #[serde(default = "default_true")]
    pub validate_inputs: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            strict_availability: false,
            validate_inputs: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit console logs as JSON lines.
    #[serde(default)]
    pub json: bool,

    #[serde(default)]
    pub file: Option<FileLogConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Daily rolling log file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLogConfig {
    #[serde(default = "default_log_directory")]
    pub directory: String,

    #[serde(default = "default_log_prefix")]
    pub prefix: String,
}

impl FileLogConfig {
    /// Directory with `~` expanded.
    pub fn directory_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.directory).into_owned())
    }
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            prefix: default_log_prefix(),
        }
    }
}

fn default_log_directory() -> String {
    "~/.pixiebrix/logs".to_string()
}

fn default_log_prefix() -> String {
    "pixiebrix.log".to_string()
}
