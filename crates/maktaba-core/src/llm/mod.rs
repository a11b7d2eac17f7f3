//! LLM provider integration — streamed chat completions restricted to a domain.
//!
//! The completion client talks to a single [`LlmProvider`] trait object.
//! The production backend is [`OpenAiProvider`], which speaks the OpenAI
//! Chat Completions format (Groq by default) with SSE streaming.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐
//! │ CompletionClient │────▶│ LlmProvider  │  (trait)
//! └──────────────────┘     └──────┬───────┘
//!                                 │
//!                   ┌─────────────┴─────────────┐
//!                   ▼                           ▼
//!          ┌─────────────────┐        ┌──────────────────┐
//!          │ OpenAiProvider  │        │ scripted (tests) │
//!          │ (SSE over HTTP) │        └──────────────────┘
//!          └─────────────────┘
//! ```

pub mod openai;
pub mod provider;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

pub use openai::OpenAiProvider;
pub use provider::{ChunkReceiver, LlmError, LlmProvider};
pub use types::*;

use crate::secrets::SecretValue;

/// Create the LLM provider described by the `[llm]` config section.
///
/// The API key is passed in separately; it is read from the environment
/// once at startup.
pub fn create_provider(
    config: &maktaba_config::LlmConfig,
    api_key: SecretValue,
) -> Arc<dyn LlmProvider> {
    let mut provider = OpenAiProvider::new(api_key)
        .with_model(&config.model)
        .with_base_url(&config.base_url);
    if config.request_timeout_secs > 0 {
        provider = provider.with_timeout(Duration::from_secs(config.request_timeout_secs));
    }
    Arc::new(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maktaba_config::LlmConfig;

    #[test]
    fn test_create_provider_from_defaults() {
        let provider = create_provider(&LlmConfig::default(), SecretValue::new("test-key"));
        assert_eq!(provider.name(), "OpenAI-compatible");
    }

    #[test]
    fn test_create_provider_without_timeout() {
        let config = LlmConfig {
            base_url: "http://localhost:11434/v1/chat/completions".to_string(),
            model: "llama3".to_string(),
            request_timeout_secs: 0,
            ..LlmConfig::default()
        };
        let provider = create_provider(&config, SecretValue::new("k"));
        assert_eq!(provider.name(), "OpenAI-compatible");
    }
}
