//! Configuration file handling for CncLink
//!
//! Supports JSON and TOML file formats, chosen by file extension and stored
//! in the platform config directory by default.
//!
//! Configuration is organized into two sections:
//! - Connection timings and transport limits
//! - Logging preferences

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use cnclink_core::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application directory name under the platform config dir
pub const APP_DIR_NAME: &str = "cnclink";

/// Default settings file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Logging preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level filter; `RUST_LOG` overrides it
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// File format, derived from the extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transport timings used for every new session
    pub connection: TransportConfig,
    /// Logging preferences
    pub logging: LoggingSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default settings file location
    ///
    /// `<config dir>/cnclink/config.toml`, falling back to the home
    /// directory and then the working directory.
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR_NAME);
        path.push(CONFIG_FILE_NAME);
        path
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Load config from `path`, or defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::from_path(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
            })?;
        }

        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        tracing::debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let connection = &self.connection;

        if connection.connect_timeout_ms == 0 {
            return Err(out_of_range("connection.connect_timeout_ms", 0));
        }
        if connection.connect_retry_delay_ms == 0 {
            return Err(out_of_range("connection.connect_retry_delay_ms", 0));
        }
        if connection.reconnect_delay_ms == 0 {
            return Err(out_of_range("connection.reconnect_delay_ms", 0));
        }
        if connection.tx_retry_delay_ms == 0 {
            return Err(out_of_range("connection.tx_retry_delay_ms", 0));
        }
        if connection.read_buffer_size == 0 {
            return Err(out_of_range("connection.read_buffer_size", 0));
        }
        if connection.status_query.trim().is_empty() {
            return Err(ConfigError::MissingValue(
                "connection.status_query".to_string(),
            ));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::ValueOutOfRange {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        Ok(())
    }
}

fn out_of_range(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::ValueOutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.connection.status_query, "?");
    }

    #[test]
    fn test_validation_rejects_zero_buffer() {
        let mut config = Config::default();
        config.connection.read_buffer_size = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ValueOutOfRange {
                key: "connection.read_buffer_size".to_string(),
                value: "0".to_string(),
            })
        );
    }

    #[test]
    fn test_validation_rejects_blank_query_and_bad_level() {
        let mut config = Config::default();
        config.connection.status_query = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingValue(_))));

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a.json")), Ok(Format::Json));
        assert_eq!(Format::from_path(Path::new("a.toml")), Ok(Format::Toml));
        assert_eq!(
            Format::from_path(Path::new("a.yaml")),
            Err(ConfigError::UnsupportedFormat("yaml".to_string()))
        );
        assert!(Format::from_path(Path::new("config")).is_err());
    }

    #[test]
    fn test_default_path_ends_with_app_file() {
        let path = Config::default_path();
        assert!(path.ends_with(Path::new(APP_DIR_NAME).join(CONFIG_FILE_NAME)));
    }
}
