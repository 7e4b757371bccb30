//! Context store: the single owner of the ephemeral chat selection.

use colloquy_core::context::{ChatContext, ContextPatch};
use colloquy_core::entity::EntityKind;
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

/// Holds the current [`ChatContext`].
///
/// All operations are synchronous and never suspend. The store does not
/// check that ids exist; callers adding an id must have confirmed it with the
/// owning repository, and [`ContextBinder`](crate::ContextBinder) retracts
/// stale ones.
#[derive(Default)]
pub struct ContextStore {
    context: RwLock<ChatContext>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current context.
    pub fn get(&self) -> ChatContext {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merges `patch` and returns the resulting context.
    pub fn update(&self, patch: ContextPatch) -> ChatContext {
        let mut context = self.write();
        context.apply(patch);
        tracing::trace!("[ContextStore] Updated: {:?}", *context);
        context.clone()
    }

    /// Clears all four fields ("new chat").
    pub fn reset(&self) -> ChatContext {
        let mut context = self.write();
        *context = ChatContext::default();
        tracing::debug!("[ContextStore] Reset");
        context.clone()
    }

    /// Removes `id` from the field that holds entities of `kind`.
    ///
    /// Returns whether anything changed.
    pub fn retract(&self, kind: EntityKind, id: &str) -> bool {
        let mut context = self.write();
        match kind {
            EntityKind::File => context.selected_files.remove(id),
            EntityKind::Prompt => clear_if(&mut context.selected_prompt, id),
            EntityKind::Channel => clear_if(&mut context.selected_channel, id),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChatContext> {
        self.context.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn clear_if(slot: &mut Option<String>, id: &str) -> bool {
    if slot.as_deref() == Some(id) {
        *slot = None;
        true
    } else {
        false
    }
}
