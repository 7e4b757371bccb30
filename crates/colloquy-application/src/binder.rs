//! Keeps the chat context consistent with the sessions and catalogs it
//! points into.

use crate::context_store::ContextStore;
use crate::session_store::SessionStore;
use colloquy_core::Result;
use colloquy_core::context::{ChatContext, ContextPatch};
use colloquy_core::entity::{EntityKind, EntityRepository};
use std::collections::BTreeSet;
use std::sync::Arc;

/// The three entity catalogs a context can reference.
#[derive(Clone)]
pub struct EntityCatalogs {
    pub files: Arc<dyn EntityRepository>,
    pub prompts: Arc<dyn EntityRepository>,
    pub channels: Arc<dyn EntityRepository>,
}

impl EntityCatalogs {
    pub fn get(&self, kind: EntityKind) -> &Arc<dyn EntityRepository> {
        match kind {
            EntityKind::File => &self.files,
            EntityKind::Prompt => &self.prompts,
            EntityKind::Channel => &self.channels,
        }
    }
}

/// Sole writer that loads session selections into the context and retracts
/// ids whose entity or session has gone away.
pub struct ContextBinder {
    context: Arc<ContextStore>,
    sessions: Arc<SessionStore>,
    catalogs: EntityCatalogs,
}

impl ContextBinder {
    pub fn new(
        context: Arc<ContextStore>,
        sessions: Arc<SessionStore>,
        catalogs: EntityCatalogs,
    ) -> Self {
        Self {
            context,
            sessions,
            catalogs,
        }
    }

    pub fn catalogs(&self) -> &EntityCatalogs {
        &self.catalogs
    }

    /// Makes `session_id` the active session and loads its file and prompt
    /// selection. Ids that no longer exist are skipped; the channel is left
    /// as is.
    ///
    /// # Errors
    ///
    /// `ChatError::NotFound` if the session does not exist. The context is
    /// unchanged.
    pub async fn activate_session(&self, session_id: &str) -> Result<ChatContext> {
        let session = self.sessions.get_session(session_id).await?;

        let files: BTreeSet<String> = session
            .file_ids
            .iter()
            .filter(|id| self.catalogs.files.exists(id))
            .cloned()
            .collect();
        let prompt = session
            .prompt_ids
            .iter()
            .find(|id| self.catalogs.prompts.exists(id))
            .cloned();

        let skipped = session.file_ids.len() - files.len();
        if skipped > 0 {
            tracing::debug!(
                "[ContextBinder] Skipped {} deleted file(s) from session {}",
                skipped,
                session_id
            );
        }

        tracing::debug!("[ContextBinder] Activated session {}", session_id);
        Ok(self.context.update(
            ContextPatch::new()
                .files(files)
                .prompt(prompt)
                .session(Some(session_id)),
        ))
    }

    /// Retracts `id` from the context after its entity was deleted.
    pub fn on_entity_deleted(&self, kind: EntityKind, id: &str) -> bool {
        let changed = self.context.retract(kind, id);
        if changed {
            tracing::debug!("[ContextBinder] Retracted deleted {} '{}'", kind, id);
        }
        changed
    }

    /// Resets the context if `session_id` was the active session.
    pub fn on_session_deleted(&self, session_id: &str) -> bool {
        if self.context.get().active_session_id.as_deref() != Some(session_id) {
            return false;
        }
        self.context.reset();
        tracing::debug!(
            "[ContextBinder] Active session {} deleted, context reset",
            session_id
        );
        true
    }

    /// Drops every selected id that no longer resolves.
    ///
    /// Used at startup and after catalogs change outside the service.
    pub async fn reconcile(&self) -> Result<ChatContext> {
        let context = self.context.get();

        if let Some(session_id) = &context.active_session_id {
            let exists = match self.sessions.exists(session_id).await {
                Ok(exists) => exists,
                // An id the repository refuses can never resolve.
                Err(e) if e.is_validation() => {
                    tracing::warn!("[ContextBinder] Dropping active session: {}", e);
                    false
                }
                Err(e) => return Err(e),
            };
            if !exists {
                self.on_session_deleted(session_id);
            }
        }

        for id in &context.selected_files {
            if !self.catalogs.files.exists(id) {
                self.on_entity_deleted(EntityKind::File, id);
            }
        }
        if let Some(id) = &context.selected_prompt
            && !self.catalogs.prompts.exists(id)
        {
            self.on_entity_deleted(EntityKind::Prompt, id);
        }
        if let Some(id) = &context.selected_channel
            && !self.catalogs.channels.exists(id)
        {
            self.on_entity_deleted(EntityKind::Channel, id);
        }

        Ok(self.context.get())
    }
}
