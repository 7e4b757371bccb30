//! Responders and repositories with controllable behaviour for engine and
//! service tests.

use async_trait::async_trait;
use colloquy_core::context::ChatContext;
use colloquy_core::responder::{AssistantReply, Responder};
use colloquy_core::session::{ChatSession, SessionRepository, SourceCitation};
use colloquy_core::{ChatError, Result};
use colloquy_infrastructure::InMemorySessionRepository;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Replies immediately with fixed content.
pub struct StaticResponder {
    reply: AssistantReply,
}

impl StaticResponder {
    pub fn new(content: &str) -> Self {
        Self {
            reply: AssistantReply::new(content),
        }
    }

    pub fn with_sources(mut self, sources: Vec<SourceCitation>) -> Self {
        self.reply.sources = sources;
        self
    }
}

#[async_trait]
impl Responder for StaticResponder {
    async fn respond(&self, _text: &str, _context: &ChatContext) -> Result<AssistantReply> {
        Ok(self.reply.clone())
    }
}

/// Always fails.
pub struct FailingResponder {
    message: String,
}

impl FailingResponder {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Responder for FailingResponder {
    async fn respond(&self, _text: &str, _context: &ChatContext) -> Result<AssistantReply> {
        Err(ChatError::assistant(self.message.clone()))
    }
}

/// Never resolves.
pub struct PendingResponder;

#[async_trait]
impl Responder for PendingResponder {
    async fn respond(&self, _text: &str, _context: &ChatContext) -> Result<AssistantReply> {
        std::future::pending().await
    }
}

/// Resolves once per call to [`GatedResponder::release`].
pub struct GatedResponder {
    content: String,
    gate: Notify,
}

impl GatedResponder {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            gate: Notify::new(),
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl Responder for GatedResponder {
    async fn respond(&self, _text: &str, _context: &ChatContext) -> Result<AssistantReply> {
        self.gate.notified().await;
        Ok(AssistantReply::new(self.content.clone()))
    }
}

/// In-memory session repository whose next `save` can be held open.
///
/// Holding a save keeps the exchange engine in `Sending`, since the user
/// message is persisted inside that state.
#[derive(Default)]
pub struct GatedSessionRepository {
    inner: InMemorySessionRepository,
    hold_next: AtomicBool,
    held: Notify,
    gate: Notify,
}

impl GatedSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `save` wait for [`GatedSessionRepository::release`].
    pub fn hold_next_save(&self) {
        self.hold_next.store(true, Ordering::SeqCst);
    }

    /// Resolves once a held `save` has started waiting.
    pub async fn wait_until_held(&self) {
        self.held.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl SessionRepository for GatedSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<ChatSession>> {
        self.inner.find_by_id(session_id).await
    }

    async fn save(&self, session: &ChatSession) -> Result<()> {
        if self.hold_next.swap(false, Ordering::SeqCst) {
            self.held.notify_one();
            self.gate.notified().await;
        }
        self.inner.save(session).await
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.inner.delete(session_id).await
    }

    async fn list_all(&self) -> Result<Vec<ChatSession>> {
        self.inner.list_all().await
    }
}
