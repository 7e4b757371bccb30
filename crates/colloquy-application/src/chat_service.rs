//! Facade the UI talks to: read-only projections plus the mutating intents.

use crate::binder::{ContextBinder, EntityCatalogs};
use crate::context_store::ContextStore;
use crate::exchange_engine::{ExchangeEngine, ExchangeOutcome, PendingReply};
use crate::session_store::SessionStore;
use colloquy_core::config::AppConfig;
use colloquy_core::context::{ChatContext, ContextPatch};
use colloquy_core::entity::{EntityKind, EntityMetadata};
use colloquy_core::exchange::{Exchange, ExchangeState};
use colloquy_core::responder::Responder;
use colloquy_core::session::{ChatSession, SessionRepository, SessionSummary};
use colloquy_core::{ChatError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Wires the context store, session store, exchange engine and binder
/// together.
///
/// All methods take `&self`; share the service behind an `Arc` to drive
/// [`ChatService::complete`] on a background task while the UI keeps
/// issuing intents.
pub struct ChatService {
    context: Arc<ContextStore>,
    sessions: Arc<SessionStore>,
    engine: ExchangeEngine,
    binder: ContextBinder,
}

impl ChatService {
    pub fn new(
        session_repository: Arc<dyn SessionRepository>,
        responder: Arc<dyn Responder>,
        catalogs: EntityCatalogs,
        config: &AppConfig,
    ) -> Self {
        let context = Arc::new(ContextStore::new());
        let sessions = Arc::new(SessionStore::new(
            session_repository,
            config.title_max_chars,
        ));
        let engine = ExchangeEngine::new(sessions.clone(), context.clone(), responder);
        let binder = ContextBinder::new(context.clone(), sessions.clone(), catalogs);

        Self {
            context,
            sessions,
            engine,
            binder,
        }
    }

    pub fn context(&self) -> ChatContext {
        self.context.get()
    }

    pub fn exchange_state(&self) -> ExchangeState {
        self.engine.state()
    }

    pub fn exchange(&self) -> Option<Exchange> {
        self.engine.exchange()
    }

    pub fn last_finished_exchange(&self) -> Option<Exchange> {
        self.engine.last_finished()
    }

    pub fn last_error(&self) -> Option<ChatError> {
        self.engine.last_error()
    }

    /// Time spent waiting on the responder, for a "still thinking" hint.
    pub fn awaiting_for(&self) -> Option<Duration> {
        self.engine.awaiting_for()
    }

    /// The active session, or `None` in new-chat mode.
    pub async fn current_session(&self) -> Result<Option<ChatSession>> {
        match self.context.get().active_session_id {
            Some(id) => self.sessions.get_session(&id).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn get_session(&self, session_id: &str) -> Result<ChatSession> {
        self.sessions.get_session(session_id).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.sessions.list_sessions().await
    }

    pub async fn search_sessions(&self, query: &str) -> Result<Vec<SessionSummary>> {
        self.sessions.search_sessions(query).await
    }

    pub fn list_entities(&self, kind: EntityKind) -> Result<Vec<EntityMetadata>> {
        self.binder.catalogs().get(kind).list()
    }

    /// See [`ExchangeEngine::submit`].
    pub async fn submit(&self, text: &str) -> Result<PendingReply> {
        self.engine.submit(text).await
    }

    /// See [`ExchangeEngine::complete`].
    pub async fn complete(&self, pending: PendingReply) -> Result<ExchangeOutcome> {
        self.engine.complete(pending).await
    }

    pub async fn send(&self, text: &str) -> Result<ExchangeOutcome> {
        self.engine.send(text).await
    }

    pub async fn cancel(&self) -> bool {
        self.engine.cancel().await
    }

    /// Applies a selection change.
    ///
    /// Every file, prompt and channel id being set must exist. Changing the
    /// active session cancels any in-flight exchange and loads the target
    /// session's selection before the rest of the patch is applied.
    ///
    /// # Errors
    ///
    /// - `ChatError::Validation` for an unknown file, prompt or channel id.
    /// - `ChatError::NotFound` for an unknown session id.
    ///
    /// The context is unchanged on error.
    pub async fn select_context(&self, patch: ContextPatch) -> Result<ChatContext> {
        self.validate_selection(&patch)?;

        let ContextPatch {
            selected_files,
            selected_prompt,
            selected_channel,
            active_session_id,
        } = patch;

        if let Some(target) = active_session_id
            && target != self.context.get().active_session_id
        {
            match target {
                Some(session_id) => {
                    if !self.sessions.exists(&session_id).await? {
                        return Err(ChatError::not_found("Session", session_id));
                    }
                    self.engine.cancel().await;
                    self.binder.activate_session(&session_id).await?;
                }
                None => {
                    self.engine.cancel().await;
                    self.context
                        .update(ContextPatch::new().session(None::<String>));
                }
            }
        }

        Ok(self.context.update(ContextPatch {
            selected_files,
            selected_prompt,
            selected_channel,
            active_session_id: None,
        }))
    }

    pub async fn switch_session(&self, session_id: &str) -> Result<ChatContext> {
        self.select_context(ContextPatch::new().session(Some(session_id)))
            .await
    }

    /// Cancels any in-flight exchange and clears the context.
    pub async fn new_chat(&self) -> ChatContext {
        if self.engine.cancel().await {
            tracing::info!("[ChatService] Cancelled in-flight exchange for new chat");
        }
        self.context.reset()
    }

    /// Restores the context from storage, e.g. after a restart, dropping ids
    /// that no longer resolve.
    pub async fn restore_context(&self, context: ChatContext) -> Result<ChatContext> {
        self.context.update(ContextPatch {
            selected_files: Some(context.selected_files),
            selected_prompt: Some(context.selected_prompt),
            selected_channel: Some(context.selected_channel),
            active_session_id: Some(context.active_session_id),
        });
        self.binder.reconcile().await
    }

    /// Deletes a session, cancelling its exchange and resetting the context
    /// if it was active. Unknown ids are ignored.
    ///
    /// An exchange still persisting its user message into the active session
    /// is waited for and then cancelled.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        let is_active = self.context.get().active_session_id.as_deref() == Some(session_id);
        if (is_active || self.engine.is_awaiting_session(session_id))
            && self.engine.cancel().await
        {
            tracing::info!(
                "[ChatService] Cancelled in-flight exchange for deleted session {}",
                session_id
            );
        }
        self.sessions.delete_session(session_id).await?;
        self.binder.on_session_deleted(session_id);
        Ok(())
    }

    pub async fn rename_session(&self, session_id: &str, title: &str) -> Result<()> {
        self.sessions.rename_session(session_id, title).await
    }

    pub fn add_entity(&self, entity: EntityMetadata) -> Result<()> {
        self.binder.catalogs().get(entity.kind()).add(entity)
    }

    /// Removes an entity from its catalog and from the current context.
    ///
    /// Sessions keep their historical references.
    pub fn delete_entity(&self, kind: EntityKind, id: &str) -> Result<bool> {
        let removed = self.binder.catalogs().get(kind).remove(id)?;
        self.binder.on_entity_deleted(kind, id);
        if removed {
            tracing::info!("[ChatService] Deleted {} '{}'", kind, id);
        }
        Ok(removed)
    }

    fn validate_selection(&self, patch: &ContextPatch) -> Result<()> {
        let catalogs = self.binder.catalogs();

        if let Some(files) = &patch.selected_files
            && let Some(missing) = files.iter().find(|id| !catalogs.files.exists(id))
        {
            return Err(unknown(EntityKind::File, missing));
        }
        if let Some(Some(id)) = &patch.selected_prompt
            && !catalogs.prompts.exists(id)
        {
            return Err(unknown(EntityKind::Prompt, id));
        }
        if let Some(Some(id)) = &patch.selected_channel
            && !catalogs.channels.exists(id)
        {
            return Err(unknown(EntityKind::Channel, id));
        }
        Ok(())
    }
}

fn unknown(kind: EntityKind, id: &str) -> ChatError {
    ChatError::validation(format!("Unknown {} '{}'", kind, id))
}
