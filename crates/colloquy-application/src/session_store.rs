//! Session store: durable session lifecycle on top of a [`SessionRepository`].

use chrono::Utc;
use colloquy_core::context::ChatContext;
use colloquy_core::session::{
    ChatSession, Message, SessionRepository, SessionSummary, Sender, derive_title,
};
use colloquy_core::{ChatError, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Owns the session log.
///
/// Every mutation is a read-modify-write against the repository, so writes
/// are serialized through `write_lock`. A call returns only after the
/// repository has accepted the change.
pub struct SessionStore {
    repository: Arc<dyn SessionRepository>,
    title_max_chars: usize,
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(repository: Arc<dyn SessionRepository>, title_max_chars: usize) -> Self {
        Self {
            repository,
            title_max_chars,
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a session whose log starts with `initial_message`.
    ///
    /// The selected files and prompt in `context` are recorded on the session;
    /// the channel is not. Returns the new session id.
    ///
    /// # Errors
    ///
    /// `ChatError::Validation` if the message is empty, not from the user, or
    /// carries sources.
    pub async fn create_session(
        &self,
        initial_message: Message,
        context: &ChatContext,
    ) -> Result<String> {
        if initial_message.content.trim().is_empty() {
            return Err(ChatError::validation("Cannot start a session with an empty message"));
        }
        if initial_message.sender != Sender::User {
            return Err(ChatError::validation(
                "A session must start with a user message",
            ));
        }
        if !initial_message.sources.is_empty() {
            return Err(ChatError::validation("User messages cannot carry sources"));
        }

        let session = ChatSession {
            id: Uuid::new_v4().to_string(),
            title: derive_title(&initial_message.content, self.title_max_chars),
            file_ids: context.selected_files.clone(),
            prompt_ids: context.selected_prompt.iter().cloned().collect(),
            created_at: initial_message.timestamp,
            updated_at: initial_message.timestamp,
            messages: vec![initial_message],
        };

        let _guard = self.write_lock.lock().await;
        self.repository.save(&session).await?;

        tracing::info!(
            "[SessionStore] Created session {} ('{}')",
            session.id,
            session.title
        );
        Ok(session.id)
    }

    /// Appends `message` to the end of the session's log.
    ///
    /// # Errors
    ///
    /// - `ChatError::NotFound` if the session does not exist.
    /// - `ChatError::Ordering` if the message predates the last one; nothing
    ///   is written.
    /// - `ChatError::Validation` for empty content or an assistant message
    ///   with no user message before it.
    pub async fn append_message(&self, session_id: &str, message: Message) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut session = self.load(session_id).await?;

        if let Err(e) = session.push_message(message) {
            if e.is_ordering() {
                tracing::error!("[SessionStore] Refused append: {}", e);
            }
            return Err(e);
        }

        self.repository.save(&session).await?;
        tracing::debug!(
            "[SessionStore] Session {} now has {} message(s)",
            session_id,
            session.messages.len()
        );
        Ok(())
    }

    /// Removes a session. Deleting an unknown id is not an error.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.repository.delete(session_id).await?;
        tracing::info!("[SessionStore] Deleted session {}", session_id);
        Ok(())
    }

    /// Summaries of all sessions, most recently updated first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries: Vec<SessionSummary> = self
            .repository
            .list_all()
            .await?
            .iter()
            .map(ChatSession::summary)
            .collect();

        summaries.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(summaries)
    }

    /// Case-insensitive search over titles and last messages.
    ///
    /// A blank query returns every session.
    pub async fn search_sessions(&self, query: &str) -> Result<Vec<SessionSummary>> {
        let query = query.trim();
        let summaries = self.list_sessions().await?;
        if query.is_empty() {
            return Ok(summaries);
        }
        Ok(summaries.into_iter().filter(|s| s.matches(query)).collect())
    }

    pub async fn get_session(&self, session_id: &str) -> Result<ChatSession> {
        self.load(session_id).await
    }

    pub async fn exists(&self, session_id: &str) -> Result<bool> {
        Ok(self.repository.find_by_id(session_id).await?.is_some())
    }

    /// Replaces the session's title and bumps `updated_at`.
    pub async fn rename_session(&self, session_id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ChatError::validation("Session title must not be empty"));
        }

        let _guard = self.write_lock.lock().await;
        let mut session = self.load(session_id).await?;
        session.title = title.to_string();
        session.touch(Utc::now());
        self.repository.save(&session).await?;

        tracing::info!("[SessionStore] Renamed session {} to '{}'", session_id, title);
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<ChatSession> {
        self.repository
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| ChatError::not_found("Session", session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use colloquy_core::context::ContextPatch;
    use colloquy_infrastructure::InMemorySessionRepository;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(InMemorySessionRepository::new()), 50)
    }

    fn at(seconds: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    #[tokio::test]
    async fn test_create_session_snapshots_files_and_prompt() {
        let store = store();
        let mut context = ChatContext::default();
        context.apply(
            ContextPatch::new()
                .files(["f1", "f2"])
                .prompt(Some("p1"))
                .channel(Some("c1")),
        );

        let id = store
            .create_session(Message::user("hello there", at(0)), &context)
            .await
            .unwrap();

        let session = store.get_session(&id).await.unwrap();
        assert_eq!(session.title, "hello there");
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.file_ids.len(), 2);
        assert_eq!(session.prompt_ids.iter().next().map(String::as_str), Some("p1"));
        assert_eq!(session.created_at, at(0));
        assert_eq!(session.updated_at, at(0));
    }

    #[tokio::test]
    async fn test_create_session_rejects_blank_message() {
        let store = store();

        let err = store
            .create_session(Message::user("   ", at(0)), &ChatContext::default())
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(store.list_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_out_of_order_is_refused_and_not_written() {
        let store = store();
        let id = store
            .create_session(Message::user("first", at(10)), &ChatContext::default())
            .await
            .unwrap();

        let err = store
            .append_message(&id, Message::user("too early", at(5)))
            .await
            .unwrap_err();

        assert!(err.is_ordering());
        assert_eq!(store.get_session(&id).await.unwrap().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_append_to_missing_session_is_not_found() {
        let err = store()
            .append_message("missing", Message::user("hi", at(0)))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_append_bumps_updated_at() {
        let store = store();
        let id = store
            .create_session(Message::user("first", at(0)), &ChatContext::default())
            .await
            .unwrap();

        store
            .append_message(&id, Message::assistant("reply", at(3), Vec::new()))
            .await
            .unwrap();

        let session = store.get_session(&id).await.unwrap();
        assert_eq!(session.updated_at, at(3));
        assert_eq!(session.created_at, at(0));
    }

    #[tokio::test]
    async fn test_list_sessions_most_recent_first() {
        let store = store();
        let older = store
            .create_session(Message::user("older", at(0)), &ChatContext::default())
            .await
            .unwrap();
        let newer = store
            .create_session(Message::user("newer", at(5)), &ChatContext::default())
            .await
            .unwrap();
        store
            .append_message(&older, Message::user("bump", at(10)))
            .await
            .unwrap();

        let ids: Vec<String> = store
            .list_sessions()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();

        assert_eq!(ids, vec![older, newer]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = store();
        let id = store
            .create_session(Message::user("bye", at(0)), &ChatContext::default())
            .await
            .unwrap();

        store.delete_session(&id).await.unwrap();
        store.delete_session(&id).await.unwrap();

        assert!(!store.exists(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_and_search() {
        let store = store();
        let id = store
            .create_session(Message::user("quarterly numbers", at(0)), &ChatContext::default())
            .await
            .unwrap();
        store
            .create_session(Message::user("holiday plans", at(1)), &ChatContext::default())
            .await
            .unwrap();

        store.rename_session(&id, "Q3 Finance").await.unwrap();

        let found = store.search_sessions("finance").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, id);
        assert_eq!(store.search_sessions("  ").await.unwrap().len(), 2);
        assert!(store.rename_session(&id, " ").await.unwrap_err().is_validation());
    }
}
