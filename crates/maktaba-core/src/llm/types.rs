//! Common types for the completion service.
//!
//! These types are the provider-neutral vocabulary for chat requests and
//! streamed responses.

use serde::{Deserialize, Serialize};

/// A chat message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant".
    pub role: String,
    /// Text content of the message.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Request for a streamed chat completion.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Model identifier (e.g. "compound-beta-mini"). Empty means the
    /// provider's default.
    pub model: String,
    /// Conversation messages, in order.
    pub messages: Vec<ChatMessage>,
    /// Hostnames the service may draw supporting material from.
    pub include_domains: Vec<String>,
}

/// A streaming chunk from the model.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// A non-empty text delta.
    Text(String),
    /// The stream has finished.
    Done { finish_reason: Option<String> },
}
