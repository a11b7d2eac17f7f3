//! Conversation orchestrator.
//!
//! [`Assistant::answer`] is the one operation the presentation layer calls
//! per question:
//!
//! ```text
//! query ──▶ per-request check ──▶ load history ──▶ budget ──▶ complete
//!              │ too long              │              │ rejected     │
//!              ▼                       │              ▼              ▼
//!         Reply::Rejected              │        Reply::Rejected   append turn
//!         (nothing read)               │        (nothing written)  save history
//!                                      └──────────────────────────▶ Reply::Answer
//! ```
//!
//! Length problems come back as a [`Reply`]; storage and completion
//! failures come back as [`AssistantError`] and leave the stored history
//! as it was.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use maktaba_config::AppConfig;

use crate::auth::SessionIdentity;
use crate::completion::CompletionClient;
use crate::context::{BudgetOutcome, BudgetRejection, ContextBudget};
use crate::history::Turn;
use crate::llm::{self, LlmError, LlmProvider};
use crate::prompt::{DEFAULT_SYSTEM_PROMPT, load_system_prompt};
use crate::secrets::SecretValue;
use crate::store::{ConversationStore, StoreError};

/// Notice shown when older turns were dropped to fit the budget.
pub const TRIMMED_NOTICE: &str =
    "Some of your previous conversation was trimmed to keep within limits.";

/// What the caller shows for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The model's answer. `trimmed` is set when older turns were evicted.
    Answer { text: String, trimmed: bool },
    /// The question was refused for length; nothing was stored.
    Rejected(BudgetRejection),
}

impl Reply {
    /// The answer text, if the question was answered.
    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Answer { text, .. } => Some(text),
            Self::Rejected(_) => None,
        }
    }

    /// The trimmed notice, if it applies to this reply.
    pub fn trimmed_notice(&self) -> Option<&'static str> {
        match self {
            Self::Answer { trimmed: true, .. } => Some(TRIMMED_NOTICE),
            _ => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Answer { text, .. } => f.write_str(text),
            Self::Rejected(rejection) => write!(f, "{rejection}"),
        }
    }
}

/// Errors that stop a question from being answered.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("history store: {0}")]
    Store(#[from] StoreError),

    #[error("completion service: {0}")]
    Llm(#[from] LlmError),

    #[error("failed to read system prompt: {0}")]
    Prompt(#[from] std::io::Error),
}

/// Answers questions within the token budget, one turn at a time.
#[derive(Clone)]
pub struct Assistant {
    completion: CompletionClient,
    budget: ContextBudget,
    system_prompt: String,
    include_domain: String,
}

impl Assistant {
    /// Build an assistant around `provider` with the built-in system prompt.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        include_domain: impl Into<String>,
        budget: ContextBudget,
    ) -> Self {
        Self {
            completion: CompletionClient::new(provider, model),
            budget,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            include_domain: include_domain.into(),
        }
    }

    /// Build the production assistant from config.
    pub async fn from_config(
        config: &AppConfig,
        api_key: SecretValue,
    ) -> Result<Self, AssistantError> {
        let provider = llm::create_provider(&config.llm, api_key);
        let system_prompt = load_system_prompt(config.llm.system_prompt_file.as_deref()).await?;
        Ok(Self::new(
            provider,
            config.llm.model.clone(),
            config.llm.include_domain.clone(),
            ContextBudget::from(&config.budget),
        )
        .with_system_prompt(system_prompt))
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn include_domain(&self) -> &str {
        &self.include_domain
    }

    /// Answer `query` for `identity`, updating its stored history.
    pub async fn answer(
        &self,
        store: &ConversationStore,
        identity: &SessionIdentity,
        query: &str,
    ) -> Result<Reply, AssistantError> {
        if let Err(rejection) = self.budget.check_query(query) {
            info!(%identity, "question rejected before loading history");
            return Ok(Reply::Rejected(rejection));
        }

        let history = store.load(identity).await?;

        let (mut history, trimmed) = match self.budget.apply(history, query) {
            BudgetOutcome::Accepted {
                history,
                was_trimmed,
            } => (history, was_trimmed),
            BudgetOutcome::Rejected(rejection) => {
                info!(%identity, %rejection, "question rejected by budget");
                return Ok(Reply::Rejected(rejection));
            }
        };

        if trimmed {
            warn!(%identity, remaining = history.len(), "history trimmed to fit budget");
        }

        let text = self
            .completion
            .complete(&self.system_prompt, &history, query, &self.include_domain)
            .await?;

        history.push(Turn::new(query, text.clone()));
        store.save(identity, &history).await?;

        info!(%identity, turns = history.len(), "question answered");
        Ok(Reply::Answer { text, trimmed })
    }
}
