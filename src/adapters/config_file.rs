//! JSON file adapter for [`ConfigPort`].
//!
//! Values are validated on both load and save; an out-of-range field is
//! rejected, never clamped.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::LinkConfig;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<LinkConfig, ConfigError> {
        let text = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::NotFound,
            _ => ConfigError::IoError(e.to_string()),
        })?;
        let config: LinkConfig =
            serde_json::from_str(&text).map_err(|e| ConfigError::Corrupted(e.to_string()))?;
        config.validate().map_err(ConfigError::ValidationFailed)?;

        info!(
            "config: loaded {} ({} profiles)",
            self.path.display(),
            config.profiles.len()
        );
        Ok(config)
    }

    fn save(&self, config: &LinkConfig) -> Result<(), ConfigError> {
        config.validate().map_err(ConfigError::ValidationFailed)?;
        let text = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        fs::write(&self.path, text).map_err(|e| ConfigError::IoError(e.to_string()))?;
        info!("config: saved {}", self.path.display());
        Ok(())
    }
}
