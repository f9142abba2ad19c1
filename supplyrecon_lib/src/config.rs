//! TOML configuration for the CLI and server.
//!
//! Matching thresholds are deliberately absent: they are constants in
//! [`crate::matching`] and [`crate::classify`].

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::report::DEFAULT_SAMPLE_SIZE;

pub const MAX_SAMPLE_SIZE: usize = 100;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    pub store: StoreConfig,
    pub run: RunConfig,
    pub server: ServerConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("supplyrecon.db"),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub include_medium: bool,
    pub sample_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            include_medium: false,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ReconConfig {
    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ReconConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SAMPLE_SIZE).contains(&self.run.sample_size) {
            return Err(ConfigError::Invalid(format!(
                "run.sample_size must be between 1 and {}, got {}",
                MAX_SAMPLE_SIZE, self.run.sample_size
            )));
        }
        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind must not be empty".to_string()));
        }
        Ok(())
    }
}
