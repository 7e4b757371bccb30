//! Resolves paths and configuration and wires up the chat service.

use anyhow::{Context, Result};
use colloquy_application::{ChatService, EntityCatalogs};
use colloquy_core::config::AppConfig;
use colloquy_core::entity::EntityKind;
use colloquy_infrastructure::{ColloquyPaths, ConfigService, TomlCatalog, TomlSessionRepository};
use colloquy_interaction::SimulatedResponder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub struct App {
    pub paths: ColloquyPaths,
    pub config: AppConfig,
    pub config_path: PathBuf,
}

impl App {
    /// Loads the config file (or defaults) and resolves data locations.
    ///
    /// With `config_override`, the catalog is looked up next to that file.
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let mut paths = ColloquyPaths::new();
        if let Some(dir) = config_override
            .as_ref()
            .and_then(|path| path.parent())
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            paths = paths.with_config_dir(dir);
        }

        let config_path = match config_override {
            Some(path) => path,
            None => paths.config_file()?,
        };
        let config = ConfigService::new(&config_path)
            .load()
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

        if let Some(dir) = &config.data_dir {
            paths = paths.with_data_dir(dir);
        }

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    /// Logs to stderr. `RUST_LOG` wins over the configured filter.
    pub fn init_tracing(&self) {
        let fallback = self.config.log_filter.as_str();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .or_else(|_| EnvFilter::try_new(fallback))
                    .unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .try_init();
    }

    pub fn catalog(&self) -> Result<Arc<TomlCatalog>> {
        let path = self.paths.catalog_file()?;
        TomlCatalog::open(&path)
            .with_context(|| format!("Failed to open catalog at {}", path.display()))
    }

    pub fn service(&self) -> Result<Arc<ChatService>> {
        let catalog = self.catalog()?;
        let catalogs = EntityCatalogs {
            files: catalog.repository(EntityKind::File),
            prompts: catalog.repository(EntityKind::Prompt),
            channels: catalog.repository(EntityKind::Channel),
        };

        let data_dir = self.paths.data_dir()?;
        let repository = TomlSessionRepository::new(&data_dir)
            .with_context(|| format!("Failed to open session store at {}", data_dir.display()))?;
        tracing::debug!("[App] Sessions stored under {}", data_dir.display());

        Ok(Arc::new(ChatService::new(
            Arc::new(repository),
            Arc::new(SimulatedResponder::from_millis(
                self.config.responder_latency_ms,
            )),
            catalogs,
            &self.config,
        )))
    }
}
