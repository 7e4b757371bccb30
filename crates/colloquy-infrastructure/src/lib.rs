//! Infrastructure layer for Colloquy: durable storage, catalogs, paths and
//! configuration loading.

pub mod catalog;
pub mod config_service;
pub mod dto;
pub mod memory_entity_repository;
pub mod memory_session_repository;
pub mod paths;
pub mod storage;
pub mod toml_session_repository;

pub use crate::catalog::TomlCatalog;
pub use crate::config_service::ConfigService;
pub use crate::memory_entity_repository::InMemoryEntityRepository;
pub use crate::memory_session_repository::InMemorySessionRepository;
pub use crate::paths::ColloquyPaths;
pub use crate::toml_session_repository::TomlSessionRepository;
