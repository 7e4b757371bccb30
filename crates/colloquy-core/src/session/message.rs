//! Conversation message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Sender {
    /// Message typed by the user.
    User,
    /// Message produced by the responder.
    Assistant,
}

/// A provenance reference attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCitation {
    /// File id (or file name) the content was drawn from
    pub file_ref: String,
    /// 1-based page number within the file
    pub page: u32,
}

impl SourceCitation {
    pub fn new(file_ref: impl Into<String>, page: u32) -> Self {
        Self {
            file_ref: file_ref.into(),
            page,
        }
    }
}

/// A single entry in a session's message log.
///
/// Messages are immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique within the owning session
    pub id: String,
    /// Non-empty text
    pub content: String,
    pub sender: Sender,
    /// Never earlier than the previous message in the same session
    pub timestamp: DateTime<Utc>,
    /// Citations; only ever non-empty on assistant messages
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceCitation>,
}

impl Message {
    /// Creates a user message with a fresh id.
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender: Sender::User,
            timestamp,
            sources: Vec::new(),
        }
    }

    /// Creates an assistant message with a fresh id.
    pub fn assistant(
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        sources: Vec<SourceCitation>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender: Sender::Assistant,
            timestamp,
            sources,
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_display_is_snake_case() {
        assert_eq!(Sender::User.to_string(), "user");
        assert_eq!("assistant".parse::<Sender>().ok(), Some(Sender::Assistant));
    }

    #[test]
    fn test_user_message_has_no_sources() {
        let message = Message::user("hello", Utc::now());
        assert!(message.is_user());
        assert!(message.sources.is_empty());
        assert!(!message.id.is_empty());
    }
}
