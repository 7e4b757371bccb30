//! Responder trait.
//!
//! The responder is the assistant backend. It is injected into the exchange
//! engine so the state machine can be driven without real timing or network
//! dependencies.

use crate::context::ChatContext;
use crate::error::Result;
use crate::session::SourceCitation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a responder produces for one user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub content: String,
    #[serde(default)]
    pub sources: Vec<SourceCitation>,
}

impl AssistantReply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<SourceCitation>) -> Self {
        self.sources = sources;
        self
    }
}

/// Produces assistant content and citations for a message.
///
/// `respond` may resolve, fail, or never resolve; callers must be able to
/// abandon it.
#[async_trait]
pub trait Responder: Send + Sync {
    /// # Arguments
    ///
    /// * `text` - The user's message
    /// * `context` - Snapshot of the context taken at submit time
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Assistant` (or any other error, which the engine
    /// treats as an assistant failure) when no reply can be produced.
    async fn respond(&self, text: &str, context: &ChatContext) -> Result<AssistantReply>;
}
