//! A completion provider that replays scripted answers.
//!
//! Each call to `chat_stream` consumes the next script in FIFO order and
//! records the request it was given. With no script left, the call fails
//! with a 500 so a test never silently gets an empty answer.

use std::collections::VecDeque;
use std::sync::Mutex;

use maktaba_core::BoxFuture;
use maktaba_core::llm::{ChatRequest, ChunkReceiver, LlmError, LlmProvider, StreamChunk};
use tokio::sync::mpsc;

enum Script {
    Answer(Vec<String>),
    FailBeforeStream(LlmError),
    FailMidStream(Vec<String>, LlmError),
}

/// Scripted [`LlmProvider`] for orchestrator tests.
#[derive(Default)]
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer streamed as the given fragments.
    pub fn push_answer(&self, fragments: &[&str]) -> &Self {
        self.lock_scripts().push_back(Script::Answer(
            fragments.iter().map(|f| f.to_string()).collect(),
        ));
        self
    }

    /// Queue a failure returned before any chunk is produced.
    pub fn push_failure(&self, err: LlmError) -> &Self {
        self.lock_scripts().push_back(Script::FailBeforeStream(err));
        self
    }

    /// Queue a stream that yields `fragments` and then breaks with `err`.
    pub fn push_mid_stream_failure(&self, fragments: &[&str], err: LlmError) -> &Self {
        self.lock_scripts().push_back(Script::FailMidStream(
            fragments.iter().map(|f| f.to_string()).collect(),
            err,
        ));
        self
    }

    /// Every request received so far, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn lock_scripts(&self) -> std::sync::MutexGuard<'_, VecDeque<Script>> {
        self.scripts.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn chat_stream(&self, request: &ChatRequest) -> BoxFuture<'_, Result<ChunkReceiver, LlmError>> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request.clone());
        let script = self.lock_scripts().pop_front();

        Box::pin(async move {
            let (fragments, tail) = match script {
                Some(Script::Answer(fragments)) => (fragments, None),
                Some(Script::FailMidStream(fragments, err)) => (fragments, Some(err)),
                Some(Script::FailBeforeStream(err)) => return Err(err),
                None => {
                    return Err(LlmError::ProviderError {
                        status: 500,
                        message: "no scripted answer left".to_string(),
                    });
                }
            };

            let (tx, rx) = mpsc::channel(fragments.len() + 1);
            for fragment in fragments {
                let _ = tx.send(Ok(StreamChunk::Text(fragment))).await;
            }
            let last = match tail {
                Some(err) => Err(err),
                None => Ok(StreamChunk::Done {
                    finish_reason: Some("stop".to_string()),
                }),
            };
            let _ = tx.send(last).await;
            Ok(rx)
        })
    }
}
