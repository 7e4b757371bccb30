//! Entity repository trait.

use super::model::{EntityKind, EntityMetadata};
use crate::error::Result;

/// Lookup for one kind of referenceable entity (files, prompts or channels).
///
/// The core only needs existence checks and display metadata; storage of the
/// underlying bytes or prompt bodies lives elsewhere.
pub trait EntityRepository: Send + Sync {
    /// The kind of entity this repository owns.
    fn kind(&self) -> EntityKind;

    /// Returns every entity, ordered by id.
    fn list(&self) -> Result<Vec<EntityMetadata>>;

    /// Returns the entity with `id`, or `ChatError::NotFound`.
    fn get(&self, id: &str) -> Result<EntityMetadata>;

    fn exists(&self, id: &str) -> bool {
        self.get(id).is_ok()
    }

    /// Inserts or replaces an entity.
    fn add(&self, entity: EntityMetadata) -> Result<()>;

    /// Removes an entity. Returns whether it was present.
    fn remove(&self, id: &str) -> Result<bool>;
}
