//! Engine configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty or missing
//! file is a valid configuration.
//!
//! ```toml
//! data_dir = "/home/me/.local/share/pyramid"
//! min_display_level = 4
//! max_arranged_level = 5
//! log_filter = "pyramid_engine=debug"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use pyramid_types::MIN_DISPLAY_LEVEL;

use crate::arranger::DEFAULT_MAX_ARRANGED_LEVEL;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PYRAMID_CONFIG";

/// Environment variable overriding `data_dir`.
pub const DATA_DIR_ENV: &str = "PYRAMID_DATA_DIR";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Where the file store keeps project documents.
    pub data_dir: PathBuf,

    /// Tiers shown even when fewer are occupied.
    pub min_display_level: i32,

    /// Highest tier bulk arrangement may assign.
    pub max_arranged_level: u32,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            min_display_level: MIN_DISPLAY_LEVEL,
            max_arranged_level: DEFAULT_MAX_ARRANGED_LEVEL,
            log_filter: None,
        }
    }
}

/// `<data_dir>/pyramid`, or `.pyramid` when the platform has no data dir.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("pyramid"))
        .unwrap_or_else(|| PathBuf::from(".pyramid"))
}

/// `<config_dir>/pyramid/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pyramid").join("config.toml"))
}

impl EngineConfig {
    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the minimum displayed tier count.
    pub fn with_min_display_level(mut self, level: i32) -> Self {
        self.min_display_level = level;
        self
    }

    /// Set the arrangement level cap.
    pub fn with_max_arranged_level(mut self, level: u32) -> Self {
        self.max_arranged_level = level;
        self
    }

    /// Set the default log filter.
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Read and parse one file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load using the process environment.
    ///
    /// `$PYRAMID_CONFIG` must name a readable file when set. Otherwise the
    /// platform config path is used if it exists, and defaults if not.
    /// `$PYRAMID_DATA_DIR` overrides `data_dir` either way.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with an injectable environment lookup.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config = match env(CONFIG_ENV) {
            Some(path) => Self::load_from(Path::new(&path))?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_from(&path)?,
                _ => Self::default(),
            },
        };
        Ok(config.with_env_overrides(env))
    }

    /// Apply environment overrides.
    pub fn with_env_overrides(mut self, env: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = env(DATA_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }
}
