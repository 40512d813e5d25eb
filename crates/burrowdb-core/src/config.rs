use crate::db::Generation;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use thiserror::Error as ThisError;

/// Default retry window when the database file is held by another handle.
pub const DEFAULT_OPEN_TIMEOUT_MS: u64 = 1_000;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] toml::de::Error),
}

///
/// Config
///
/// Per-database options. Every key is optional in TOML:
///
/// ```toml
/// generation = "0.6"
/// auto_increment = true
/// open_timeout_ms = 1000
/// debug = false
/// ```
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub generation: Generation,
    pub auto_increment: bool,
    pub open_timeout_ms: u64,
    pub debug: bool,
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    #[must_use]
    pub const fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    #[must_use]
    pub const fn with_generation(mut self, generation: Generation) -> Self {
        self.generation = generation;
        self
    }

    #[must_use]
    pub const fn with_auto_increment(mut self, enabled: bool) -> Self {
        self.auto_increment = enabled;
        self
    }

    #[must_use]
    pub const fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            generation: Generation::LATEST,
            auto_increment: false,
            open_timeout_ms: DEFAULT_OPEN_TIMEOUT_MS,
            debug: false,
        }
    }
}

///
/// TESTS
///
