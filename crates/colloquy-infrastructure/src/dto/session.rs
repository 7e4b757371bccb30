//! Session DTOs (on-disk representation).
//!
//! The domain `ChatSession` never touches disk directly; it is converted to
//! the current versioned DTO on save and back on load.

use chrono::{DateTime, Utc};
use colloquy_core::Result;
use colloquy_core::session::{ChatSession, Message, Sender, SourceCitation};
use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, Migrator, Versioned};

/// Entity name the session migration path is registered under.
pub const SESSION_ENTITY: &str = "session";

/// Citation as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceV1_0_0 {
    pub file_ref: String,
    pub page: u32,
}

/// Message as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageV1_0_0 {
    pub id: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceV1_0_0>,
}

/// V1.0.0 of the session file schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct SessionV1_0_0 {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub prompt_ids: Vec<String>,
    #[serde(default)]
    pub messages: Vec<MessageV1_0_0>,
}

impl FromDomain<ChatSession> for SessionV1_0_0 {
    fn from_domain(session: ChatSession) -> Self {
        Self {
            id: session.id,
            title: session.title,
            created_at: session.created_at,
            updated_at: session.updated_at,
            file_ids: session.file_ids.into_iter().collect(),
            prompt_ids: session.prompt_ids.into_iter().collect(),
            messages: session
                .messages
                .into_iter()
                .map(|m| MessageV1_0_0 {
                    id: m.id,
                    sender: m.sender,
                    timestamp: m.timestamp,
                    content: m.content,
                    sources: m
                        .sources
                        .into_iter()
                        .map(|s| SourceV1_0_0 {
                            file_ref: s.file_ref,
                            page: s.page,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl IntoDomain<ChatSession> for SessionV1_0_0 {
    fn into_domain(self) -> ChatSession {
        ChatSession {
            id: self.id,
            title: self.title,
            messages: self
                .messages
                .into_iter()
                .map(|m| Message {
                    id: m.id,
                    content: m.content,
                    sender: m.sender,
                    timestamp: m.timestamp,
                    sources: m
                        .sources
                        .into_iter()
                        .map(|s| SourceCitation::new(s.file_ref, s.page))
                        .collect(),
                })
                .collect(),
            file_ids: self.file_ids.into_iter().collect(),
            prompt_ids: self.prompt_ids.into_iter().collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Builds the migrator for session files.
///
/// # Migration Path
///
/// - V1.0.0 -> ChatSession (saved back as V1.0.0)
///
/// Files carrying a version with no registered step fail to load.
pub fn create_session_migrator() -> Result<Migrator> {
    let mut migrator = Migrator::builder().build();
    let session_path = Migrator::define(SESSION_ENTITY)
        .from::<SessionV1_0_0>()
        .into_with_save::<ChatSession>();
    migrator.register(session_path)?;
    Ok(migrator)
}
