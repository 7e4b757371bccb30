//! Chat context domain model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The set of references that scopes the next message exchange.
///
/// Every id held here must exist in its owning repository outside of a
/// reconciliation window. An empty `active_session_id` means "new chat" mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatContext {
    /// Selected file ids (order-irrelevant, no duplicates)
    #[serde(default)]
    pub selected_files: BTreeSet<String>,
    /// Selected prompt id
    #[serde(default)]
    pub selected_prompt: Option<String>,
    /// Selected channel id
    #[serde(default)]
    pub selected_channel: Option<String>,
    /// Session the next message is appended to
    #[serde(default)]
    pub active_session_id: Option<String>,
}

impl ChatContext {
    /// Returns true if the context carries at least one file reference.
    pub fn has_files(&self) -> bool {
        !self.selected_files.is_empty()
    }

    /// Returns true when no session is active.
    pub fn is_new_chat(&self) -> bool {
        self.active_session_id.is_none()
    }

    /// Merges `patch` into this context.
    ///
    /// Files are replaced wholesale; prompt, channel and session are replaced
    /// as scalars. Fields absent from the patch are left untouched.
    pub fn apply(&mut self, patch: ContextPatch) {
        if let Some(files) = patch.selected_files {
            self.selected_files = files;
        }
        if let Some(prompt) = patch.selected_prompt {
            self.selected_prompt = prompt;
        }
        if let Some(channel) = patch.selected_channel {
            self.selected_channel = channel;
        }
        if let Some(session) = patch.active_session_id {
            self.active_session_id = session;
        }
    }
}

/// A partial update to a [`ChatContext`].
///
/// `None` leaves a field unchanged. For scalar fields `Some(None)` clears the
/// field and `Some(Some(id))` sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPatch {
    #[serde(default)]
    pub selected_files: Option<BTreeSet<String>>,
    #[serde(default)]
    pub selected_prompt: Option<Option<String>>,
    #[serde(default)]
    pub selected_channel: Option<Option<String>>,
    #[serde(default)]
    pub active_session_id: Option<Option<String>>,
}

impl ContextPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    pub fn prompt(mut self, prompt: Option<impl Into<String>>) -> Self {
        self.selected_prompt = Some(prompt.map(Into::into));
        self
    }

    pub fn channel(mut self, channel: Option<impl Into<String>>) -> Self {
        self.selected_channel = Some(channel.map(Into::into));
        self
    }

    pub fn session(mut self, session_id: Option<impl Into<String>>) -> Self {
        self.active_session_id = Some(session_id.map(Into::into));
        self
    }

    /// Returns true if applying the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self.selected_files.is_none()
            && self.selected_prompt.is_none()
            && self.selected_channel.is_none()
            && self.active_session_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_replaces_files_wholesale() {
        let mut context = ChatContext::default();
        context.apply(ContextPatch::new().files(["a", "b"]));
        context.apply(ContextPatch::new().files(["c"]));

        assert_eq!(context.selected_files.len(), 1);
        assert!(context.selected_files.contains("c"));
    }

    #[test]
    fn test_apply_leaves_absent_fields_untouched() {
        let mut context = ChatContext::default();
        context.apply(
            ContextPatch::new()
                .prompt(Some("p1"))
                .channel(Some("general")),
        );
        context.apply(ContextPatch::new().files(["f1"]));

        assert_eq!(context.selected_prompt.as_deref(), Some("p1"));
        assert_eq!(context.selected_channel.as_deref(), Some("general"));
    }

    #[test]
    fn test_apply_clears_scalar() {
        let mut context = ChatContext::default();
        context.apply(ContextPatch::new().session(Some("s1")));
        assert!(!context.is_new_chat());

        context.apply(ContextPatch::new().session(None::<String>));
        assert!(context.is_new_chat());
    }

    #[test]
    fn test_duplicate_files_collapse() {
        let patch = ContextPatch::new().files(["f1", "f1", "f2"]);
        assert_eq!(patch.selected_files.map(|f| f.len()), Some(2));
    }
}
