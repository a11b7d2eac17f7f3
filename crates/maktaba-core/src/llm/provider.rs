//! LLM provider trait — the seam between the completion client and the wire.
//!
//! The production backend is the OpenAI-compatible provider; tests plug in
//! scripted providers through the same interface.

use tokio::sync::mpsc;

use crate::BoxFuture;

use super::types::{ChatRequest, StreamChunk};

/// Receiving half of a streamed completion.
///
/// Yields chunks in arrival order and closes after the last one. It cannot
/// be restarted.
pub type ChunkReceiver = mpsc::Receiver<Result<StreamChunk, LlmError>>;

/// Errors from LLM provider calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("authentication failed (check API key): {0}")]
    Auth(String),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("provider error: {status} — {message}")]
    ProviderError { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("timeout")]
    Timeout,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

/// Core trait for completion providers.
///
/// Implementations must be `Send + Sync`. Uses `BoxFuture` for object safety
/// (allows `Arc<dyn LlmProvider>`).
pub trait LlmProvider: Send + Sync {
    /// Provider display name.
    fn name(&self) -> &str;

    /// Start a streaming chat completion.
    ///
    /// Errors that occur before the first byte (auth, rate limit, HTTP
    /// status) are returned directly; later failures arrive on the channel.
    fn chat_stream(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChunkReceiver, LlmError>>;
}
