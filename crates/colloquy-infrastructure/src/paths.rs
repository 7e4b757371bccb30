//! Unified path management for Colloquy files.
//!
//! ```text
//! ~/.config/colloquy/          # Config directory
//! ├── config.toml              # Application configuration
//! └── catalog.toml             # Files, prompts and channels
//!
//! ~/.local/share/colloquy/     # Data directory (overridable via config)
//! └── sessions/                # One TOML file per chat session
//! ```

use std::path::PathBuf;

const APP_DIR_NAME: &str = "colloquy";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config or data directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for colloquy_core::ChatError {
    fn from(err: PathError) -> Self {
        colloquy_core::ChatError::config(err.to_string())
    }
}

/// Resolves where Colloquy keeps its files.
///
/// Either directory can be pinned explicitly; otherwise the platform
/// defaults from `dirs` are used.
#[derive(Debug, Clone, Default)]
pub struct ColloquyPaths {
    config_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
}

impl ColloquyPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Returns the configuration directory (e.g. `~/.config/colloquy/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.config_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    /// Returns the data directory (e.g. `~/.local/share/colloquy/`).
    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    pub fn catalog_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("catalog.toml"))
    }

    pub fn sessions_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("sessions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dirs_win() {
        let paths = ColloquyPaths::new()
            .with_config_dir("/tmp/cfg")
            .with_data_dir("/tmp/data");

        assert_eq!(
            paths.config_file().unwrap(),
            PathBuf::from("/tmp/cfg/config.toml")
        );
        assert_eq!(
            paths.catalog_file().unwrap(),
            PathBuf::from("/tmp/cfg/catalog.toml")
        );
        assert_eq!(
            paths.sessions_dir().unwrap(),
            PathBuf::from("/tmp/data/sessions")
        );
    }
}
