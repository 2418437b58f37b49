//! slowtest.toml configuration
//!
//! ```toml
//! [feature]
//! testNamesPatterns = "suite\\..*"
//! minDuration = 1000
//! threshold = "80"
//!
//! [detector]
//! stop_at_first_regression = false
//! ```
//!
//! Feature parameters are layered: built-in defaults, then the file, then
//! command-line overrides. Values stay textual until the decision policy is
//! resolved, so a malformed value disables detection instead of failing here.

use crate::regression::{default_parameters, DetectorOptions, FeatureParameters};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "slowtest.toml";

/// Errors loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Root of slowtest.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Raw feature parameters, keyed like the CI feature settings
    #[serde(default)]
    pub feature: FeatureParameters,

    #[serde(default)]
    pub detector: DetectorOptions,
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, else `slowtest.toml` when it exists, else defaults
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Defaults overlaid with the file's feature parameters and `overrides`
    pub fn effective_parameters(&self, overrides: &FeatureParameters) -> FeatureParameters {
        let mut params = default_parameters();
        params.merge(&self.feature);
        params.merge(overrides);
        params
    }
}
