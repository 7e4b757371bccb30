//! Exchange engine: drives one user-message -> assistant-message round trip.
//!
//! A send happens in two phases. [`ExchangeEngine::submit`] persists the
//! user message (creating a session first in new-chat mode) and moves the
//! engine to `AwaitingResponse`. [`ExchangeEngine::complete`] then waits for
//! the responder and appends its reply. Splitting the phases lets a caller
//! keep the pending reply on a background task while the UI stays free to
//! cancel.
//!
//! Every submit and cancel bumps a generation counter. A reply is appended
//! only if its generation is still current when it settles, so a late
//! response can never land in a session the user has moved away from.

use crate::context_store::ContextStore;
use crate::session_store::SessionStore;
use chrono::{DateTime, Utc};
use colloquy_core::context::{ChatContext, ContextPatch};
use colloquy_core::exchange::{Exchange, ExchangeState};
use colloquy_core::responder::Responder;
use colloquy_core::session::Message;
use colloquy_core::{ChatError, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How a [`PendingReply`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The assistant message was appended.
    Settled(Message),
    /// The responder failed. The user message stays in the log.
    Failed(ChatError),
    /// The exchange was cancelled or superseded; its reply was discarded.
    Cancelled,
}

impl ExchangeOutcome {
    pub fn message(&self) -> Option<&Message> {
        match self {
            ExchangeOutcome::Settled(message) => Some(message),
            _ => None,
        }
    }
}

/// Handle for an exchange whose user message has been persisted.
///
/// Pass it to [`ExchangeEngine::complete`]. Dropping it without completing
/// leaves the engine in `AwaitingResponse` until [`ExchangeEngine::cancel`].
#[derive(Debug)]
pub struct PendingReply {
    exchange: Exchange,
    text: String,
    context: ChatContext,
    user_timestamp: DateTime<Utc>,
    token: CancellationToken,
}

impl PendingReply {
    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    pub fn session_id(&self) -> &str {
        &self.exchange.session_id
    }

    /// Context snapshot taken at submit time.
    pub fn context(&self) -> &ChatContext {
        &self.context
    }
}

#[derive(Default)]
struct EngineState {
    state: ExchangeState,
    generation: u64,
    current: Option<Exchange>,
    token: Option<CancellationToken>,
    awaiting_since: Option<Instant>,
    last_finished: Option<Exchange>,
    last_error: Option<ChatError>,
}

impl EngineState {
    /// Returns to idle, recording how the current exchange ended.
    fn finish(&mut self, final_state: ExchangeState) {
        if let Some(mut exchange) = self.current.take() {
            exchange.state = final_state;
            self.last_finished = Some(exchange);
        }
        self.token = None;
        self.awaiting_since = None;
        self.state = ExchangeState::Idle;
    }
}

pub struct ExchangeEngine {
    sessions: Arc<SessionStore>,
    context: Arc<ContextStore>,
    responder: Arc<dyn Responder>,
    inner: Mutex<EngineState>,
    // Serializes the persistence phase of submit, the settle step of
    // complete, and cancel.
    write_gate: tokio::sync::Mutex<()>,
}

impl ExchangeEngine {
    pub fn new(
        sessions: Arc<SessionStore>,
        context: Arc<ContextStore>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            sessions,
            context,
            responder,
            inner: Mutex::new(EngineState::default()),
            write_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> ExchangeState {
        self.lock().state
    }

    /// The in-flight exchange, if any.
    pub fn exchange(&self) -> Option<Exchange> {
        self.lock().current.clone()
    }

    /// The most recent exchange that settled, failed or was cancelled.
    pub fn last_finished(&self) -> Option<Exchange> {
        self.lock().last_finished.clone()
    }

    /// The responder error from the most recent failed exchange.
    ///
    /// Cleared by the next submit.
    pub fn last_error(&self) -> Option<ChatError> {
        self.lock().last_error.clone()
    }

    /// How long the current exchange has been waiting on the responder.
    pub fn awaiting_for(&self) -> Option<Duration> {
        self.lock().awaiting_since.map(|since| since.elapsed())
    }

    /// Persists `text` as a user message and starts waiting for a reply.
    ///
    /// In new-chat mode a session is created from the current context and
    /// becomes the active session. Otherwise the message is appended to the
    /// active session.
    ///
    /// # Errors
    ///
    /// - `ChatError::Validation` for blank text, or when an exchange is
    ///   already in flight. The engine state is unchanged.
    /// - `ChatError::NotFound` if the active session no longer exists.
    /// - Storage errors from persisting the message. The engine returns to
    ///   idle.
    pub async fn submit(&self, text: &str) -> Result<PendingReply> {
        if text.trim().is_empty() {
            return Err(ChatError::validation("Message must not be empty"));
        }
        self.ensure_idle()?;

        let _gate = self.write_gate.lock().await;
        let generation = {
            let mut inner = self.lock();
            if !inner.state.accepts_submit() {
                return Err(busy(inner.state));
            }
            inner.state = ExchangeState::Sending;
            inner.generation += 1;
            inner.last_error = None;
            inner.generation
        };
        tracing::debug!("[ExchangeEngine] idle -> sending (generation {})", generation);

        let (session_id, message, context) = match self.persist_user_message(text).await {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!("[ExchangeEngine] Failed to persist user message: {}", e);
                self.lock().state = ExchangeState::Idle;
                return Err(e);
            }
        };

        let exchange = Exchange {
            session_id,
            pending_message_id: message.id.clone(),
            started_at: message.timestamp,
            state: ExchangeState::AwaitingResponse,
            generation,
        };
        let token = CancellationToken::new();
        {
            let mut inner = self.lock();
            inner.state = ExchangeState::AwaitingResponse;
            inner.current = Some(exchange.clone());
            inner.token = Some(token.clone());
            inner.awaiting_since = Some(Instant::now());
        }
        tracing::debug!(
            "[ExchangeEngine] sending -> awaiting_response (session {})",
            exchange.session_id
        );

        Ok(PendingReply {
            exchange,
            text: text.to_string(),
            context,
            user_timestamp: message.timestamp,
            token,
        })
    }

    /// Waits for the responder and settles the exchange.
    ///
    /// Sources are kept only if files were selected when the message was
    /// submitted. A reply that arrives after the exchange was cancelled or
    /// superseded is discarded.
    ///
    /// # Errors
    ///
    /// Errors from appending the assistant message (for example
    /// `ChatError::NotFound` if the session was deleted). Responder failures
    /// are reported as [`ExchangeOutcome::Failed`] instead.
    pub async fn complete(&self, pending: PendingReply) -> Result<ExchangeOutcome> {
        let PendingReply {
            exchange,
            text,
            context,
            user_timestamp,
            token,
        } = pending;

        let reply = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!(
                    "[ExchangeEngine] Abandoned responder for generation {}",
                    exchange.generation
                );
                return Ok(ExchangeOutcome::Cancelled);
            }
            reply = self.responder.respond(&text, &context) => reply,
        };

        let _gate = self.write_gate.lock().await;
        if !self.is_current(exchange.generation) {
            tracing::warn!(
                "[ExchangeEngine] Discarding stale reply for session {} (generation {})",
                exchange.session_id,
                exchange.generation
            );
            return Ok(ExchangeOutcome::Cancelled);
        }

        let reply = match reply {
            Ok(reply) if !reply.content.trim().is_empty() => reply,
            Ok(_) => return Ok(self.fail(ChatError::assistant("Assistant returned an empty reply"))),
            Err(e) => return Ok(self.fail(into_assistant_error(e))),
        };

        let sources = if context.has_files() {
            reply.sources
        } else {
            if !reply.sources.is_empty() {
                tracing::debug!(
                    "[ExchangeEngine] Dropping {} source(s): no files were selected",
                    reply.sources.len()
                );
            }
            Vec::new()
        };
        let message = Message::assistant(reply.content, Utc::now().max(user_timestamp), sources);

        if let Err(e) = self
            .sessions
            .append_message(&exchange.session_id, message.clone())
            .await
        {
            tracing::warn!("[ExchangeEngine] Could not store reply: {}", e);
            self.lock().finish(ExchangeState::Idle);
            return Err(e);
        }

        self.lock().finish(ExchangeState::Settled);
        tracing::debug!("[ExchangeEngine] awaiting_response -> settled -> idle");
        Ok(ExchangeOutcome::Settled(message))
    }

    /// Submits `text` and waits for the reply.
    pub async fn send(&self, text: &str) -> Result<ExchangeOutcome> {
        let pending = self.submit(text).await?;
        self.complete(pending).await
    }

    /// Cancels the in-flight exchange.
    ///
    /// The persisted user message stays. Returns whether anything was
    /// cancelled.
    pub async fn cancel(&self) -> bool {
        let _gate = self.write_gate.lock().await;
        let mut inner = self.lock();
        if inner.state != ExchangeState::AwaitingResponse {
            return false;
        }

        inner.generation += 1;
        if let Some(token) = inner.token.take() {
            token.cancel();
        }
        inner.finish(ExchangeState::Cancelled);
        tracing::debug!(
            "[ExchangeEngine] awaiting_response -> cancelled -> idle (generation {})",
            inner.generation
        );
        true
    }

    /// Whether the in-flight exchange targets `session_id`.
    pub fn is_awaiting_session(&self, session_id: &str) -> bool {
        self.lock()
            .current
            .as_ref()
            .is_some_and(|exchange| exchange.session_id == session_id)
    }

    async fn persist_user_message(&self, text: &str) -> Result<(String, Message, ChatContext)> {
        let mut context = self.context.get();
        let now = Utc::now();

        match context.active_session_id.clone() {
            Some(session_id) => {
                let session = self.sessions.get_session(&session_id).await?;
                let timestamp = session.last_timestamp().map_or(now, |last| now.max(last));
                let message = Message::user(text, timestamp);
                self.sessions
                    .append_message(&session_id, message.clone())
                    .await?;
                Ok((session_id, message, context))
            }
            None => {
                let message = Message::user(text, now);
                let session_id = self
                    .sessions
                    .create_session(message.clone(), &context)
                    .await?;
                self.context
                    .update(ContextPatch::new().session(Some(session_id.clone())));
                context.active_session_id = Some(session_id.clone());
                Ok((session_id, message, context))
            }
        }
    }

    fn fail(&self, error: ChatError) -> ExchangeOutcome {
        tracing::warn!("[ExchangeEngine] Responder failed: {}", error);
        let mut inner = self.lock();
        inner.last_error = Some(error.clone());
        inner.finish(ExchangeState::Idle);
        ExchangeOutcome::Failed(error)
    }

    fn ensure_idle(&self) -> Result<()> {
        let state = self.lock().state;
        if state.accepts_submit() {
            Ok(())
        } else {
            Err(busy(state))
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        let inner = self.lock();
        inner.generation == generation && inner.state == ExchangeState::AwaitingResponse
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn busy(state: ExchangeState) -> ChatError {
    ChatError::validation(format!(
        "Cannot send while an exchange is in progress ({})",
        state
    ))
}

fn into_assistant_error(error: ChatError) -> ChatError {
    if error.is_assistant() {
        error
    } else {
        ChatError::assistant(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingResponder, GatedResponder, PendingResponder, StaticResponder};
    use colloquy_core::session::SourceCitation;
    use colloquy_infrastructure::InMemorySessionRepository;

    struct Harness {
        engine: Arc<ExchangeEngine>,
        sessions: Arc<SessionStore>,
        context: Arc<ContextStore>,
    }

    fn harness(responder: Arc<dyn Responder>) -> Harness {
        let sessions = Arc::new(SessionStore::new(
            Arc::new(InMemorySessionRepository::new()),
            50,
        ));
        let context = Arc::new(ContextStore::new());
        let engine = Arc::new(ExchangeEngine::new(
            sessions.clone(),
            context.clone(),
            responder,
        ));
        Harness {
            engine,
            sessions,
            context,
        }
    }

    #[tokio::test]
    async fn test_send_in_new_chat_creates_session_and_settles() {
        let h = harness(Arc::new(StaticResponder::new("hi back")));

        let outcome = h.engine.send("hello").await.unwrap();

        let session_id = h.context.get().active_session_id.unwrap();
        let session = h.sessions.get_session(&session_id).await.unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].content, "hello");
        assert_eq!(session.messages[1].content, "hi back");
        assert_eq!(outcome.message(), Some(&session.messages[1]));
        assert!(session.messages[1].timestamp >= session.messages[0].timestamp);
        assert_eq!(h.engine.state(), ExchangeState::Idle);
        assert_eq!(
            h.engine.last_finished().map(|e| e.state),
            Some(ExchangeState::Settled)
        );
    }

    #[tokio::test]
    async fn test_blank_submit_is_rejected_without_side_effects() {
        let h = harness(Arc::new(StaticResponder::new("unused")));

        let err = h.engine.submit("  \n").await.unwrap_err();

        assert!(err.is_validation());
        assert_eq!(h.engine.state(), ExchangeState::Idle);
        assert!(h.sessions.list_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_while_awaiting_is_rejected() {
        let h = harness(Arc::new(PendingResponder));

        let pending = h.engine.submit("first").await.unwrap();
        assert_eq!(h.engine.state(), ExchangeState::AwaitingResponse);

        let err = h.engine.submit("second").await.unwrap_err();
        assert!(err.is_validation());

        let session = h.sessions.get_session(pending.session_id()).await.unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(h.engine.exchange().unwrap().generation, pending.exchange().generation);
    }

    #[tokio::test]
    async fn test_failure_keeps_user_message_and_returns_to_idle() {
        let h = harness(Arc::new(FailingResponder::new("model unavailable")));

        let outcome = h.engine.send("are you there?").await.unwrap();

        let ExchangeOutcome::Failed(err) = outcome else {
            panic!("expected a failed outcome");
        };
        assert!(err.is_assistant());
        assert_eq!(h.engine.state(), ExchangeState::Idle);
        assert_eq!(h.engine.last_error(), Some(err));

        let session_id = h.context.get().active_session_id.unwrap();
        let session = h.sessions.get_session(&session_id).await.unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].content, "are you there?");
    }

    #[tokio::test]
    async fn test_next_submit_clears_last_error() {
        let h = harness(Arc::new(FailingResponder::new("boom")));
        h.engine.send("one").await.unwrap();
        assert!(h.engine.last_error().is_some());

        let _pending = h.engine.submit("two").await.unwrap();

        assert!(h.engine.last_error().is_none());
    }

    #[tokio::test]
    async fn test_cancel_abandons_never_resolving_responder() {
        let h = harness(Arc::new(PendingResponder));
        let pending = h.engine.submit("hello?").await.unwrap();
        let session_id = pending.session_id().to_string();

        let engine = h.engine.clone();
        let task = tokio::spawn(async move { engine.complete(pending).await });
        tokio::task::yield_now().await;

        assert!(h.engine.cancel().await);
        let outcome = task.await.unwrap().unwrap();

        assert_eq!(outcome, ExchangeOutcome::Cancelled);
        assert_eq!(h.engine.state(), ExchangeState::Idle);
        assert_eq!(
            h.engine.last_finished().map(|e| e.state),
            Some(ExchangeState::Cancelled)
        );
        let session = h.sessions.get_session(&session_id).await.unwrap();
        assert_eq!(session.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_noop() {
        let h = harness(Arc::new(PendingResponder));

        assert!(!h.engine.cancel().await);
        assert_eq!(h.engine.state(), ExchangeState::Idle);
    }

    #[tokio::test]
    async fn test_stale_reply_is_not_appended() {
        let responder = Arc::new(GatedResponder::new("late answer"));
        let h = harness(responder.clone());

        let first = h.engine.submit("first").await.unwrap();
        let first_session = first.session_id().to_string();
        let engine = h.engine.clone();
        let task = tokio::spawn(async move { engine.complete(first).await });
        tokio::task::yield_now().await;

        h.engine.cancel().await;
        h.context.reset();
        responder.release();
        assert_eq!(task.await.unwrap().unwrap(), ExchangeOutcome::Cancelled);

        let second = h.engine.submit("second").await.unwrap();
        assert_ne!(second.session_id(), first_session);

        let stale = h.sessions.get_session(&first_session).await.unwrap();
        assert_eq!(stale.messages.len(), 1);
        let fresh = h.sessions.get_session(second.session_id()).await.unwrap();
        assert_eq!(fresh.messages.len(), 1);
        assert_eq!(fresh.messages[0].content, "second");
    }

    #[tokio::test]
    async fn test_sources_dropped_without_selected_files() {
        let responder = StaticResponder::new("see page 3")
            .with_sources(vec![SourceCitation::new("ghost.pdf", 3)]);
        let h = harness(Arc::new(responder));

        let outcome = h.engine.send("cite something").await.unwrap();

        assert!(outcome.message().unwrap().sources.is_empty());
    }

    #[tokio::test]
    async fn test_sources_kept_with_selected_files() {
        let responder = StaticResponder::new("see page 3")
            .with_sources(vec![SourceCitation::new("report.pdf", 3)]);
        let h = harness(Arc::new(responder));
        h.context.update(ContextPatch::new().files(["report.pdf"]));

        let outcome = h.engine.send("cite something").await.unwrap();

        assert_eq!(
            outcome.message().unwrap().sources,
            vec![SourceCitation::new("report.pdf", 3)]
        );
    }

    #[tokio::test]
    async fn test_send_appends_to_active_session() {
        let h = harness(Arc::new(StaticResponder::new("ok")));
        h.engine.send("one").await.unwrap();
        let session_id = h.context.get().active_session_id.unwrap();

        h.engine.send("two").await.unwrap();

        let session = h.sessions.get_session(&session_id).await.unwrap();
        let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "ok", "two", "ok"]);
        assert_eq!(h.sessions.list_sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_to_deleted_active_session_is_not_found() {
        let h = harness(Arc::new(StaticResponder::new("ok")));
        h.context.update(ContextPatch::new().session(Some("gone")));

        let err = h.engine.submit("hello").await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(h.engine.state(), ExchangeState::Idle);
    }

    #[tokio::test]
    async fn test_reply_for_vanished_session_ends_idle() {
        let responder = Arc::new(GatedResponder::new("too late"));
        let h = harness(responder.clone());
        let pending = h.engine.submit("hello").await.unwrap();
        let session_id = pending.session_id().to_string();

        h.sessions.delete_session(&session_id).await.unwrap();
        responder.release();
        let err = h.engine.complete(pending).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(h.engine.state(), ExchangeState::Idle);
        assert_eq!(
            h.engine.last_finished().map(|e| e.state),
            Some(ExchangeState::Idle)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_awaiting_for_tracks_elapsed_time() {
        let h = harness(Arc::new(PendingResponder));
        assert!(h.engine.awaiting_for().is_none());

        let _pending = h.engine.submit("tick").await.unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        assert!(h.engine.awaiting_for().unwrap() >= Duration::from_secs(3));
    }
}
