// Configuration for the GBA state reader

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::constants::DEFAULT_READ_TIMEOUT;
use crate::core::layout::Layout;
use crate::core::snapshot::SnapshotOptions;

// =============================================================================
// CONFIGURATION STRUCTURES
// =============================================================================

/// Emulator debug server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmulatorSettings {
    /// Base URL of the debug HTTP server
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT.as_millis() as u64
}

impl EmulatorSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for EmulatorSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoggingSettings {
    /// Also log to stdout
    #[serde(default)]
    pub console: bool,
    /// Log file path. Empty = no file logging.
    #[serde(default)]
    pub log_file: String,
}

impl LoggingSettings {
    /// Log file path, if one is configured
    pub fn log_file_path(&self) -> Option<PathBuf> {
        if self.log_file.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.log_file))
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub emulator: EmulatorSettings,
    #[serde(default)]
    pub snapshot: SnapshotOptions,
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Replaces the built-in Emerald layout when present
    #[serde(default)]
    pub layout: Option<Layout>,
}

// =============================================================================
// CONFIG LOADING
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    /// Nothing at `searched`, built-in defaults used
    Defaults { searched: PathBuf },
}

impl ConfigOrigin {
    /// Report how `config` was obtained
    ///
    /// Call once logging is initialized, since the logging settings come
    /// from the config itself.
    pub fn log(&self, config: &Config) {
        match self {
            ConfigOrigin::File(path) => info!(
                path = %path.display(),
                custom_layout = config.layout.is_some(),
                strict = config.snapshot.strict,
                "[config] Loaded config"
            ),
            ConfigOrigin::Defaults { searched } => debug!(
                path = %searched.display(),
                "[config] No config found, using defaults"
            ),
        }
    }
}

impl Config {
    pub const CONFIG_FILENAME: &'static str = "gba_state_reader.toml";

    /// Parse configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from `path` without logging
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load_with_origin(path: &Path) -> Result<(Self, ConfigOrigin), ConfigError> {
        if !path.exists() {
            return Ok((
                Config::default(),
                ConfigOrigin::Defaults {
                    searched: path.to_path_buf(),
                },
            ));
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        Ok((config, ConfigOrigin::File(path.to_path_buf())))
    }

    /// Load configuration from `path`, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let (config, origin) = Self::load_with_origin(path)?;
        origin.log(&config);
        Ok(config)
    }

    /// Configured layout, or the Emerald catalog
    pub fn layout(&self) -> Layout {
        self.layout.clone().unwrap_or_else(Layout::emerald)
    }
}
