#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Typing core configuration.
//!
//! Configuration is stored in TOML format and can be loaded from files or
//! created with sensible defaults: a realm name, the directories an
//! engine searches for IDL on startup, and a logging level.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    /// Failed to parse the TOML configuration file.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// Failed to serialize configuration to TOML format.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Configuration file was not found at the specified path.
    #[error("Config file not found at: {0}")]
    NotFound(PathBuf),
    /// Could not locate the user's configuration directory.
    #[error("Could not find user config directory")]
    ConfigDirUnavailable,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Reserved realm name. Carried through for forward compatibility
    /// with the wire's `%realm` field; an engine never validates it
    /// against anything.
    pub realm: Option<String>,
    /// Directories an engine walks for `.yaml` files on startup, in
    /// order. Generalizes the original's hardcoded
    /// `/usr/local/share/idl`.
    pub search_paths: Vec<PathBuf>,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error).
    pub level: String,
    /// Log file path, if logging to a file rather than stderr.
    pub file: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from a TOML file at `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Saves this configuration as pretty-printed TOML at `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// The default config file path: `{config_dir()}/rpct/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::ConfigDirUnavailable)?.join("rpct");
        Ok(config_dir.join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            realm: None,
            search_paths: vec![PathBuf::from("/usr/local/share/idl")],
            logging: LoggingConfig { level: "info".to_string(), file: None },
        }
    }
}
