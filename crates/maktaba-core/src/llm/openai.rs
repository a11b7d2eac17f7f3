//! OpenAI-compatible chat completions provider.
//!
//! Implements [`LlmProvider`] for any endpoint that speaks the OpenAI Chat
//! Completions format with Server-Sent Events streaming. The default target
//! is Groq, whose compound models accept a `search_settings.include_domains`
//! restriction limiting web search to the listed hostnames.

use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::BoxFuture;
use crate::secrets::SecretValue;

use super::provider::{ChunkReceiver, LlmError, LlmProvider};
use super::types::*;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MODEL: &str = "compound-beta-mini";

/// OpenAI-compatible streaming provider.
pub struct OpenAiProvider {
    client: Client,
    api_key: SecretValue,
    base_url: String,
    default_model: String,
    timeout: Option<Duration>,
}

impl OpenAiProvider {
    /// Create a new provider with the given API key.
    pub fn new(api_key: SecretValue) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GROQ_API_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout: None,
        }
    }

    /// Set the default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set a custom endpoint URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Bound each request, including reading the whole stream.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Convert our ChatRequest into the wire format.
    fn build_request_body(&self, request: &ChatRequest) -> OpenAiRequest {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let messages = request
            .messages
            .iter()
            .map(|m| OpenAiMessage {
                role: m.role.clone(),
                content: m.content.clone(),
            })
            .collect();

        let search_settings = if request.include_domains.is_empty() {
            None
        } else {
            Some(SearchSettings {
                include_domains: request.include_domains.clone(),
            })
        };

        OpenAiRequest {
            model,
            messages,
            stream: true,
            search_settings,
        }
    }
}

impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "OpenAI-compatible"
    }

    fn chat_stream(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChunkReceiver, LlmError>> {
        let body = self.build_request_body(request);
        Box::pin(async move {
            debug!(
                model = %body.model,
                messages = body.messages.len(),
                domains = ?body.search_settings.as_ref().map(|s| &s.include_domains),
                "chat completion request"
            );

            let mut builder = self
                .client
                .post(&self.base_url)
                .header(
                    "authorization",
                    format!("Bearer {}", self.api_key.expose()),
                )
                .header("accept", "text/event-stream")
                .json(&body);
            if let Some(timeout) = self.timeout {
                builder = builder.timeout(timeout);
            }

            let resp = builder.send().await?;

            let status = resp.status().as_u16();
            if status == 401 || status == 403 {
                return Err(LlmError::Auth("invalid API key".to_string()));
            }
            if status == 429 {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60);
                return Err(LlmError::RateLimited {
                    retry_after_secs: retry_after,
                });
            }
            if !resp.status().is_success() {
                let error_body = resp.text().await.unwrap_or_default();
                return Err(LlmError::ProviderError {
                    status,
                    message: error_body,
                });
            }

            let (tx, rx) = mpsc::channel(64);
            tokio::spawn(async move {
                let mut events = resp.bytes_stream().eventsource();
                let mut finish_reason = None;

                while let Some(event) = events.next().await {
                    let event = match event {
                        Ok(event) => event,
                        Err(e) => {
                            warn!(error = %e, "completion stream broke");
                            let _ = tx.send(Err(LlmError::Stream(e.to_string()))).await;
                            return;
                        }
                    };

                    match parse_event_data(&event.data) {
                        Ok(SseData::Done) => break,
                        Ok(SseData::Skip) => {}
                        Ok(SseData::Delta {
                            text,
                            finish_reason: reason,
                        }) => {
                            if reason.is_some() {
                                finish_reason = reason;
                            }
                            if let Some(text) = text {
                                if tx.send(Ok(StreamChunk::Text(text))).await.is_err() {
                                    // Receiver dropped; nobody wants the rest.
                                    return;
                                }
                            }
                        }
                        Err(e) => {
                            let _ = tx.send(Err(e)).await;
                            return;
                        }
                    }
                }

                let _ = tx.send(Ok(StreamChunk::Done { finish_reason })).await;
            });

            Ok(rx)
        })
    }
}

/// One decoded SSE `data:` payload.
#[derive(Debug, PartialEq)]
enum SseData {
    /// The `[DONE]` sentinel.
    Done,
    /// Nothing to emit (keep-alive or empty payload).
    Skip,
    /// A delta; `text` is `None` for role-only or empty deltas.
    Delta {
        text: Option<String>,
        finish_reason: Option<String>,
    },
}

fn parse_event_data(data: &str) -> Result<SseData, LlmError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(SseData::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseData::Done);
    }

    let chunk: OpenAiStreamChunk =
        serde_json::from_str(data).map_err(|e| LlmError::Parse(e.to_string()))?;

    if let Some(error) = chunk.error {
        return Err(LlmError::Stream(error.message));
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(SseData::Skip);
    };

    Ok(SseData::Delta {
        text: choice.delta.content.filter(|c| !c.is_empty()),
        finish_reason: choice.finish_reason,
    })
}

// ── Wire types (private) ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    search_settings: Option<SearchSettings>,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct SearchSettings {
    include_domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    #[serde(default)]
    error: Option<OpenAiStreamError>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamError {
    message: String,
}
