//! CncLink Settings Crate
//!
//! Loads, validates and saves the application settings file.

pub mod config;
pub mod error;
pub mod persistence;

pub use config::{Config, LoggingSettings, APP_DIR_NAME, CONFIG_FILE_NAME};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
pub use persistence::SettingsPersistence;
