//! Completion client: turns a history and a query into one finished answer.
//!
//! Builds the role-tagged message sequence, starts a streamed completion
//! restricted to one domain, and drains the stream into a single string.
//! Any failure, before or during the stream, fails the whole call.

use std::sync::Arc;

use tracing::{debug, info};

use crate::history::History;
use crate::llm::{ChatMessage, ChatRequest, LlmError, LlmProvider, StreamChunk};

/// Streams completions from an [`LlmProvider`] and collects them.
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl CompletionClient {
    /// `model` may be empty to use the provider's default.
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the message sequence: system, then a user/assistant pair per
    /// turn oldest first, then the query as the final user message.
    pub fn build_messages(system_prompt: &str, history: &History, query: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::system(system_prompt));
        for turn in history {
            messages.push(ChatMessage::user(turn.question()));
            messages.push(ChatMessage::assistant(turn.answer()));
        }
        messages.push(ChatMessage::user(query));
        messages
    }

    /// Request a completion and return the concatenated text deltas.
    ///
    /// A stream that closes without an explicit end marker counts as
    /// complete.
    pub async fn complete(
        &self,
        system_prompt: &str,
        history: &History,
        query: &str,
        domain: &str,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: Self::build_messages(system_prompt, history, query),
            include_domains: vec![domain.to_string()],
        };

        debug!(
            provider = self.provider.name(),
            messages = request.messages.len(),
            domain,
            "starting completion"
        );

        let mut rx = self.provider.chat_stream(&request).await?;
        let mut answer = String::new();
        let mut fragments = 0usize;

        while let Some(chunk) = rx.recv().await {
            match chunk? {
                StreamChunk::Text(text) => {
                    fragments += 1;
                    answer.push_str(&text);
                }
                StreamChunk::Done { finish_reason } => {
                    debug!(?finish_reason, "completion stream finished");
                    break;
                }
            }
        }

        info!(fragments, chars = answer.chars().count(), "completion received");
        Ok(answer)
    }
}
