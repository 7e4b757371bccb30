//! In-memory EntityRepository.

use colloquy_core::entity::{EntityKind, EntityMetadata, EntityRepository};
use colloquy_core::{ChatError, Result};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Holds entities of one kind in a map keyed by id.
pub struct InMemoryEntityRepository {
    kind: EntityKind,
    entities: RwLock<BTreeMap<String, EntityMetadata>>,
}

impl InMemoryEntityRepository {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            entities: RwLock::new(BTreeMap::new()),
        }
    }

    /// Builds a repository pre-populated with `entities`.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Validation` if any entity is of a different kind.
    pub fn with_entities(
        kind: EntityKind,
        entities: impl IntoIterator<Item = EntityMetadata>,
    ) -> Result<Self> {
        let repository = Self::new(kind);
        for entity in entities {
            repository.add(entity)?;
        }
        Ok(repository)
    }
}

impl EntityRepository for InMemoryEntityRepository {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn list(&self) -> Result<Vec<EntityMetadata>> {
        Ok(self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect())
    }

    fn get(&self, id: &str) -> Result<EntityMetadata> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| ChatError::not_found(self.kind.entity_type(), id))
    }

    fn add(&self, entity: EntityMetadata) -> Result<()> {
        if entity.kind() != self.kind {
            return Err(ChatError::validation(format!(
                "Cannot store a {} in the {} repository",
                entity.kind(),
                self.kind
            )));
        }
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entity.id.clone(), entity);
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool> {
        Ok(self
            .entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some())
    }
}
