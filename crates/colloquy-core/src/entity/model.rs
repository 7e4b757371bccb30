//! Display metadata for the entities a context can reference.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The three kinds of entity a [`ChatContext`](crate::context::ChatContext)
/// can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    File,
    Prompt,
    Channel,
}

impl EntityKind {
    /// Name used in `NotFound` errors.
    pub fn entity_type(self) -> &'static str {
        match self {
            EntityKind::File => "File",
            EntityKind::Prompt => "Prompt",
            EntityKind::Channel => "Channel",
        }
    }
}

/// Kind-specific metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityDetails {
    File { file_type: String, file_size: u64 },
    Prompt { category: String },
    Channel,
}

/// What the core needs to know about an entity: that it exists, and how to
/// show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub id: String,
    /// File name, prompt name or channel name
    pub name: String,
    pub details: EntityDetails,
}

impl EntityMetadata {
    pub fn file(
        id: impl Into<String>,
        filename: impl Into<String>,
        file_type: impl Into<String>,
        file_size: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: filename.into(),
            details: EntityDetails::File {
                file_type: file_type.into(),
                file_size,
            },
        }
    }

    pub fn prompt(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            details: EntityDetails::Prompt {
                category: category.into(),
            },
        }
    }

    pub fn channel(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            details: EntityDetails::Channel,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self.details {
            EntityDetails::File { .. } => EntityKind::File,
            EntityDetails::Prompt { .. } => EntityKind::Prompt,
            EntityDetails::Channel => EntityKind::Channel,
        }
    }
}
