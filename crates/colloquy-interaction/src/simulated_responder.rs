//! A demo assistant that answers after a fixed delay.
//!
//! It does not talk to any model. The reply acknowledges the message and
//! describes the context it was given, and every selected file is cited at
//! page 1.

use async_trait::async_trait;
use colloquy_core::Result;
use colloquy_core::context::ChatContext;
use colloquy_core::responder::{AssistantReply, Responder};
use colloquy_core::session::SourceCitation;
use std::time::Duration;

pub struct SimulatedResponder {
    latency: Duration,
}

impl SimulatedResponder {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn from_millis(latency_ms: u64) -> Self {
        Self::new(Duration::from_millis(latency_ms))
    }

    fn compose(text: &str, context: &ChatContext) -> String {
        let mut context_info = Vec::new();
        if context.has_files() {
            context_info.push(format!("{} file(s)", context.selected_files.len()));
        }
        if context.selected_prompt.is_some() {
            context_info.push("a prompt".to_string());
        }
        if context.selected_channel.is_some() {
            context_info.push("channel context".to_string());
        }

        let guidance = if context_info.is_empty() {
            "Select files, a prompt, or a channel to give me more context.".to_string()
        } else {
            format!(
                "I'm working with your {} to answer.",
                context_info.join(", ")
            )
        };

        format!("I understand your message: \"{}\". {}", text.trim(), guidance)
    }
}

impl Default for SimulatedResponder {
    fn default() -> Self {
        Self::from_millis(2000)
    }
}

#[async_trait]
impl Responder for SimulatedResponder {
    async fn respond(&self, text: &str, context: &ChatContext) -> Result<AssistantReply> {
        tracing::debug!(
            "[SimulatedResponder] Replying in {:?} ({} file(s) in context)",
            self.latency,
            context.selected_files.len()
        );
        tokio::time::sleep(self.latency).await;

        let sources = context
            .selected_files
            .iter()
            .map(|file| SourceCitation::new(file.clone(), 1))
            .collect();

        Ok(AssistantReply::new(Self::compose(text, context)).with_sources(sources))
    }
}
