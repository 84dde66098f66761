//! Configuration validation.

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;

use crate::error::ConfigError;
use crate::schema::Config;

/// Delays above this are almost always a unit mistake.
const LARGE_DELAY_MS: u64 = 60_000;

const LARGE_RETRY_COUNT: u32 = 20;

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// First error as a [`ConfigError`], for callers that refuse to start
    /// on an invalid configuration.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::Rejected {
                setting: error.path,
                reason: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::validate_retry(config, &mut result);
        Self::validate_logging(config, &mut result);
        result
    }

    fn validate_retry(config: &Config, result: &mut ValidationResult) {
        let retry = &config.messenger.retry;

        if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
            result.add_error(ValidationError::new(
                "messenger.retry.backoff_multiplier",
                format!("must be at least 1.0, got {}", retry.backoff_multiplier),
            ));
        }

        if retry.base_delay_ms > retry.max_delay_ms {
            result.add_error(ValidationError::new(
                "messenger.retry.base_delay_ms",
                format!(
                    "base delay {}ms exceeds max delay {}ms",
                    retry.base_delay_ms, retry.max_delay_ms
                ),
            ));
        }

        if retry.max_delay_ms > LARGE_DELAY_MS {
            result.add_warning(ValidationWarning::new(
                "messenger.retry.max_delay_ms",
                format!(
                    "max delay is very high ({}ms), unreachable targets will take long to fail",
                    retry.max_delay_ms
                ),
            ));
        }

        if retry.max_retries > LARGE_RETRY_COUNT {
            result.add_warning(ValidationWarning::new(
                "messenger.retry.max_retries",
                format!("{} retries is very high (>{})", retry.max_retries, LARGE_RETRY_COUNT),
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.trim().to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            result.add_error(ValidationError::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, LOG_LEVELS
                ),
            ));
        }

        if let Some(file) = &config.logging.file {
            if file.prefix.trim().is_empty() {
                result.add_error(ValidationError::new(
                    "logging.file.prefix",
                    "Log file prefix cannot be empty",
                ));
            }
        }
    }
}
