//! Settings Persistence
//!
//! Pairs a [`Config`] with the file it came from so front ends can load,
//! adjust and write back settings without tracking the path themselves.

use crate::config::Config;
use crate::error::SettingsResult;
use std::path::{Path, PathBuf};

/// Settings persistence layer
#[derive(Debug, Clone)]
pub struct SettingsPersistence {
    config: Config,
    path: PathBuf,
}

impl SettingsPersistence {
    /// Load settings from `path`; a missing file yields defaults
    pub fn open(path: impl Into<PathBuf>) -> SettingsResult<Self> {
        let path = path.into();
        let config = Config::load_or_default(&path)?;
        Ok(Self { config, path })
    }

    /// Write the current settings back to their file
    pub fn save(&self) -> SettingsResult<()> {
        self.config.save_to_file(&self.path)
    }

    /// Settings file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Consume the layer, keeping only the settings
    pub fn into_config(self) -> Config {
        self.config
    }
}
