//! Session repository trait.
//!
//! Defines the interface for session persistence operations.

use super::model::ChatSession;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract durable key-value store for chat sessions.
///
/// Keys are session ids; values are whole `ChatSession`s. Implementations
/// must have persisted a write by the time `save` or `delete` returns.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ChatSession))`: Session found
    /// - `Ok(None)`: Session not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, session_id: &str) -> Result<Option<ChatSession>>;

    /// Saves (inserts or replaces) a session.
    async fn save(&self, session: &ChatSession) -> Result<()>;

    /// Deletes a session. Deleting an absent id succeeds.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Lists all stored sessions, in no particular order.
    async fn list_all(&self) -> Result<Vec<ChatSession>>;
}
