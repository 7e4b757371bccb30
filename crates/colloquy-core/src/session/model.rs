//! Session domain model.
//!
//! A `ChatSession` is a durable, named, append-only message log together with
//! the file and prompt ids that were in context when it was created.

use super::message::{Message, Sender};
use crate::error::{ChatError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Marker appended to titles that were cut short.
const TITLE_ELLIPSIS: char = '…';

/// Represents a chat session in the application's domain layer.
///
/// This is the "pure" model that business logic operates on, independent of
/// any storage format or version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Derived from the first user message unless renamed
    pub title: String,
    /// Ordered, append-only log
    pub messages: Vec<Message>,
    /// Snapshot of the files selected when the session was created
    pub file_ids: BTreeSet<String>,
    /// Snapshot of the prompts used
    pub prompt_ids: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    /// Monotonically non-decreasing
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Timestamp of the newest message, if any.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(|m| m.timestamp)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Checks that `message` may be appended without breaking the log's
    /// invariants.
    pub fn check_append(&self, message: &Message) -> Result<()> {
        if message.content.trim().is_empty() {
            return Err(ChatError::validation("Message content must not be empty"));
        }

        if let Some(previous) = self.last_timestamp()
            && message.timestamp < previous
        {
            return Err(ChatError::Ordering {
                session_id: self.id.clone(),
                previous,
                attempted: message.timestamp,
            });
        }

        if message.sender == Sender::Assistant && !self.messages.iter().any(Message::is_user) {
            return Err(ChatError::validation(
                "Assistant message requires a preceding user message",
            ));
        }

        if message.sender == Sender::User && !message.sources.is_empty() {
            return Err(ChatError::validation("User messages cannot carry sources"));
        }

        if self.messages.iter().any(|m| m.id == message.id) {
            return Err(ChatError::validation(format!(
                "Duplicate message id '{}' in session '{}'",
                message.id, self.id
            )));
        }

        Ok(())
    }

    /// Appends `message` after validating it, bumping `updated_at`.
    pub fn push_message(&mut self, message: Message) -> Result<()> {
        self.check_append(&message)?;
        self.touch(message.timestamp);
        self.messages.push(message);
        Ok(())
    }

    /// Advances `updated_at` to `at`, never moving it backwards.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.updated_at {
            self.updated_at = at;
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            message_count: self.messages.len(),
            last_message: self.last_message().map(|m| m.content.clone()),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Read-only projection used by session lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub message_count: usize,
    pub last_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Case-insensitive match against the title and the last message.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        self.title.to_lowercase().contains(&needle)
            || self
                .last_message
                .as_deref()
                .is_some_and(|m| m.to_lowercase().contains(&needle))
    }
}

/// Derives a session title from the first user message.
///
/// Whitespace runs are collapsed and the result is cut to `max_chars`
/// characters, with an ellipsis when something was dropped.
pub fn derive_title(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let mut title: String = collapsed
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect();
    title.truncate(title.trim_end().len());
    title.push(TITLE_ELLIPSIS);
    title
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SourceCitation;
    use chrono::Duration;

    fn empty_session(at: DateTime<Utc>) -> ChatSession {
        ChatSession {
            id: "s1".to_string(),
            title: "Test".to_string(),
            messages: Vec::new(),
            file_ids: BTreeSet::new(),
            prompt_ids: BTreeSet::new(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_push_message_bumps_updated_at() {
        let start = Utc::now();
        let mut session = empty_session(start);
        let later = start + Duration::seconds(5);

        session.push_message(Message::user("hi", later)).unwrap();

        assert_eq!(session.updated_at, later);
        assert_eq!(session.messages.len(), 1);
    }

    #[test]
    fn test_push_message_rejects_earlier_timestamp() {
        let start = Utc::now();
        let mut session = empty_session(start);
        session.push_message(Message::user("first", start)).unwrap();

        let err = session
            .push_message(Message::user("second", start - Duration::seconds(1)))
            .unwrap_err();

        assert!(err.is_ordering());
        assert_eq!(session.messages.len(), 1);
    }

    #[test]
    fn test_equal_timestamps_are_allowed() {
        let start = Utc::now();
        let mut session = empty_session(start);
        session.push_message(Message::user("q", start)).unwrap();
        session
            .push_message(Message::assistant("a", start, vec![SourceCitation::new("f", 1)]))
            .unwrap();

        assert_eq!(session.messages.len(), 2);
    }

    #[test]
    fn test_assistant_needs_preceding_user_message() {
        let mut session = empty_session(Utc::now());
        let err = session
            .push_message(Message::assistant("orphan", Utc::now(), Vec::new()))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_user_message_cannot_carry_sources() {
        let mut session = empty_session(Utc::now());
        let message = Message {
            sources: vec![SourceCitation::new("report.pdf", 1)],
            ..Message::user("with a citation", Utc::now())
        };

        let err = session.push_message(message).unwrap_err();

        assert!(err.is_validation());
        assert!(session.messages.is_empty());
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let start = Utc::now();
        let mut session = empty_session(start);
        session.touch(start - Duration::minutes(1));
        assert_eq!(session.updated_at, start);
    }

    #[test]
    fn test_derive_title() {
        assert_eq!(derive_title("  hello \n world ", 50), "hello world");
        assert_eq!(derive_title("abcdefghij", 5), "abcd…");
        assert_eq!(derive_title("abc def", 5), "abc…");
    }

    #[test]
    fn test_summary_matches_last_message() {
        let start = Utc::now();
        let mut session = empty_session(start);
        session
            .push_message(Message::user("POST request is returning 404", start))
            .unwrap();

        let summary = session.summary();
        assert!(summary.matches("returning"));
        assert!(summary.matches("test"));
        assert!(!summary.matches("schema"));
        assert_eq!(summary.message_count, 1);
    }
}
