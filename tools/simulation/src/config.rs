//! Simulation configuration
//!
//! One JSON document bundles the engine and generator settings with the
//! output paths and the run bounds. Every field has a default, so an empty
//! object (or no file at all) gives the classic unbounded run writing
//! `trace.txt` and `sharePrice.txt` in the working directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use matching_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::GeneratorConfig;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full configuration of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub engine: EngineConfig,
    pub generator: GeneratorConfig,
    /// One line per trade
    pub trace_path: PathBuf,
    /// One line per price update
    pub price_path: PathBuf,
    /// Stop producing after this many orders
    pub order_limit: Option<u64>,
    /// Stop producing after this many seconds
    pub duration_secs: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            generator: GeneratorConfig::default(),
            trace_path: PathBuf::from("trace.txt"),
            price_path: PathBuf::from("sharePrice.txt"),
            order_limit: None,
            duration_secs: None,
        }
    }
}

impl SimulationConfig {
    /// Read and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.generator.validate()?;
        if self.trace_path == self.price_path {
            return Err(ConfigError::Invalid(format!(
                "trace and price output share the path {}",
                self.trace_path.display()
            )));
        }
        Ok(())
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs)
    }

    /// Whether the run ends on its own
    pub fn is_bounded(&self) -> bool {
        self.order_limit.is_some() || self.duration_secs.is_some()
    }
}
