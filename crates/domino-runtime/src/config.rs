//! Scheduler configuration

use std::path::Path;

use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::blocks::BoxError;

/// Prefix of environment variables overriding config values,
/// e.g. `DOMINO_MAX_BLOCKING_ACTIONS`
pub const ENV_PREFIX: &str = "DOMINO";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn from_load(path: &Path, error: ::config::ConfigError) -> Self {
        match error {
            ::config::ConfigError::Foreign(source) => ConfigError::Io {
                path: path.display().to_string(),
                source,
            },
            other => ConfigError::Parse(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct DominoConfig {
    /// How many blocking actions may run on the worker pool at once
    #[builder(default = 64)]
    pub max_blocking_actions: usize,

    /// Log the type of every harvested follow-up at debug level
    #[builder(default = true)]
    pub log_follow_ups: bool,
}

impl Default for DominoConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DominoConfig {
    /// Load config from a YAML file, applying `DOMINO_*` environment overrides
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: &Path, environment: Environment) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(false))
            .add_source(environment.try_parsing(true))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConfigError::from_load(path, e))?;

        config.validate()?;
        tracing::debug!("Loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(contents, FileFormat::Yaml))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_blocking_actions == 0 {
            return Err(ConfigError::Invalid(
                "max_blocking_actions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
