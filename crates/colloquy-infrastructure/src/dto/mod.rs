//! Data Transfer Objects for persistence.
//!
//! DTOs carry an explicit schema version and are the only types written to
//! disk. Loading goes through a `version_migrate::Migrator`, which picks the
//! DTO by the file's `version` key and converts it into the domain model.
//! Catalog entry DTOs live next to the catalog in `catalog.rs`.

mod session;

pub use session::{
    MessageV1_0_0, SESSION_ENTITY, SessionV1_0_0, SourceV1_0_0, create_session_migrator,
};
