//! TOML-backed catalog of files, prompts and channels.
//!
//! One `catalog.toml` holds all three kinds:
//!
//! ```toml
//! [[files]]
//! id = "1"
//! filename = "document1.pdf"
//! file_type = "application/pdf"
//! file_size = 1024000
//!
//! [[prompts]]
//! id = "p1"
//! name = "Code Review"
//! category = "development"
//!
//! [[channels]]
//! id = "c1"
//! name = "general"
//! ```

use crate::storage::AtomicTomlFile;
use colloquy_core::entity::{EntityDetails, EntityKind, EntityMetadata, EntityRepository};
use colloquy_core::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub id: String,
    pub name: String,
}

/// Root of `catalog.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub files: Vec<FileEntry>,
    #[serde(default)]
    pub prompts: Vec<PromptEntry>,
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

impl CatalogDocument {
    fn entities(&self, kind: EntityKind) -> Vec<EntityMetadata> {
        let mut entities: Vec<EntityMetadata> = match kind {
            EntityKind::File => self
                .files
                .iter()
                .map(|f| EntityMetadata::file(&f.id, &f.filename, &f.file_type, f.file_size))
                .collect(),
            EntityKind::Prompt => self
                .prompts
                .iter()
                .map(|p| EntityMetadata::prompt(&p.id, &p.name, &p.category))
                .collect(),
            EntityKind::Channel => self
                .channels
                .iter()
                .map(|c| EntityMetadata::channel(&c.id, &c.name))
                .collect(),
        };
        entities.sort_by(|a, b| a.id.cmp(&b.id));
        entities
    }

    fn upsert(&mut self, entity: EntityMetadata) {
        let EntityMetadata { id, name, details } = entity;
        match details {
            EntityDetails::File {
                file_type,
                file_size,
            } => {
                self.files.retain(|f| f.id != id);
                self.files.push(FileEntry {
                    id,
                    filename: name,
                    file_type,
                    file_size,
                });
            }
            EntityDetails::Prompt { category } => {
                self.prompts.retain(|p| p.id != id);
                self.prompts.push(PromptEntry { id, name, category });
            }
            EntityDetails::Channel => {
                self.channels.retain(|c| c.id != id);
                self.channels.push(ChannelEntry { id, name });
            }
        }
    }

    fn remove(&mut self, kind: EntityKind, id: &str) -> bool {
        let before = self.len(kind);
        match kind {
            EntityKind::File => self.files.retain(|f| f.id != id),
            EntityKind::Prompt => self.prompts.retain(|p| p.id != id),
            EntityKind::Channel => self.channels.retain(|c| c.id != id),
        }
        self.len(kind) != before
    }

    fn len(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::File => self.files.len(),
            EntityKind::Prompt => self.prompts.len(),
            EntityKind::Channel => self.channels.len(),
        }
    }
}

/// The catalog file plus an in-memory copy that serves reads.
pub struct TomlCatalog {
    file: AtomicTomlFile<CatalogDocument>,
    document: RwLock<CatalogDocument>,
}

impl TomlCatalog {
    /// Opens (or starts empty, if missing) the catalog at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Arc<Self>> {
        let file = AtomicTomlFile::<CatalogDocument>::new(path);
        let document = file.load()?.unwrap_or_default();

        tracing::debug!(
            "[TomlCatalog] Loaded {} file(s), {} prompt(s), {} channel(s) from {:?}",
            document.files.len(),
            document.prompts.len(),
            document.channels.len(),
            file.path()
        );

        Ok(Arc::new(Self {
            file,
            document: RwLock::new(document),
        }))
    }

    /// A repository view over one kind of entry.
    pub fn repository(self: &Arc<Self>, kind: EntityKind) -> Arc<dyn EntityRepository> {
        Arc::new(CatalogRepository {
            catalog: Arc::clone(self),
            kind,
        })
    }

    fn read(&self) -> CatalogDocument {
        self.document
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `f` to the on-disk document under the file lock, persists it,
    /// and refreshes the cache.
    ///
    /// The document is re-read inside the lock so edits made by another
    /// process since `open` are kept.
    fn write<R>(&self, f: impl FnOnce(&mut CatalogDocument) -> R) -> Result<R> {
        let mut guard = self
            .document
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let (result, updated) = self.file.update(CatalogDocument::default(), |document| {
            let result = f(document);
            (result, document.clone())
        })?;
        *guard = updated;
        Ok(result)
    }
}

struct CatalogRepository {
    catalog: Arc<TomlCatalog>,
    kind: EntityKind,
}

impl EntityRepository for CatalogRepository {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn list(&self) -> Result<Vec<EntityMetadata>> {
        Ok(self.catalog.read().entities(self.kind))
    }

    fn get(&self, id: &str) -> Result<EntityMetadata> {
        self.catalog
            .read()
            .entities(self.kind)
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ChatError::not_found(self.kind.entity_type(), id))
    }

    fn add(&self, entity: EntityMetadata) -> Result<()> {
        if entity.kind() != self.kind {
            return Err(ChatError::validation(format!(
                "Cannot store a {} in the {} catalog",
                entity.kind(),
                self.kind
            )));
        }
        self.catalog.write(|doc| doc.upsert(entity))
    }

    fn remove(&self, id: &str) -> Result<bool> {
        self.catalog.write(|doc| doc.remove(self.kind, id))
    }
}
