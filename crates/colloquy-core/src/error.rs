//! Error types for Colloquy.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// A shared error type for every Colloquy crate.
///
/// Every variant is scoped to the single operation that raised it; none is
/// fatal to the process.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChatError {
    /// Empty input or a malformed context patch. Re-prompt the user.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A stale id was handed to a store or repository.
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A message would have broken the timestamp order of a session log.
    #[error(
        "Ordering violation in session '{session_id}': {attempted} is earlier than {previous}"
    )]
    Ordering {
        session_id: String,
        previous: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    /// The responder failed to produce a reply.
    #[error("Assistant error: {0}")]
    Assistant(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn assistant(message: impl Into<String>) -> Self {
        Self::Assistant(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::Ordering { .. })
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self, Self::Assistant(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ChatError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ChatError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<version_migrate::MigrationError> for ChatError {
    fn from(err: version_migrate::MigrationError) -> Self {
        use version_migrate::MigrationError;

        let message = err.to_string();
        match err {
            MigrationError::TomlParseError(_) | MigrationError::TomlSerializeError(_) => {
                Self::Serialization {
                    format: "TOML".to_string(),
                    message,
                }
            }
            _ => Self::Serialization {
                format: "migration".to_string(),
                message,
            },
        }
    }
}

/// A type alias for `Result<T, ChatError>`.
pub type Result<T> = std::result::Result<T, ChatError>;
