//! Loads and saves `config.toml`.

use crate::storage::{AtomicTomlFile, StorageError};
use colloquy_core::config::AppConfig;
use colloquy_core::{ChatError, Result};
use std::path::{Path, PathBuf};

pub struct ConfigService {
    file: AtomicTomlFile<AppConfig>,
}

impl ConfigService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Loads the configuration.
    ///
    /// A missing or blank file yields `AppConfig::default()`.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Config` if the file cannot be read or parsed.
    pub fn load(&self) -> Result<AppConfig> {
        match self.file.load() {
            Ok(Some(config)) => Ok(config),
            Ok(None) => {
                tracing::debug!(
                    "[ConfigService] No config at {:?}, using defaults",
                    self.file.path()
                );
                Ok(AppConfig::default())
            }
            Err(e) => Err(ChatError::config(e.to_string())),
        }
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        self.file
            .save(config)
            .map_err(|e: StorageError| ChatError::config(e.to_string()))
    }
}
