//! Configuration loader.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::ConfigError;
use crate::schema::Config;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]+)\}").unwrap_or_else(|e| unreachable!("invalid env var pattern: {e}"))
});

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        Ok(toml::from_str(&expanded)?)
    }

    /// Replace every `${VAR}` with the value of the environment variable.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut missing = None;
        let expanded = ENV_VAR.replace_all(content, |caps: &Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| {
                missing.get_or_insert_with(|| caps[1].to_string());
                String::new()
            })
        });

        match missing {
            Some(name) => Err(ConfigError::MissingEnvVar(name)),
            None => Ok(expanded.into_owned()),
        }
    }
}
