//! Entity references: files, prompts and channels.

mod model;
mod repository;

pub use model::{EntityDetails, EntityKind, EntityMetadata};
pub use repository::EntityRepository;
