#![deny(unsafe_code)]

//! Maktaba core: a single-domain question-answering assistant.
//!
//! Every question passes through a fixed token budget before it reaches the
//! completion service. Authenticated users have their history persisted;
//! guests keep theirs for the life of the session only.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future — the return type for trait
/// methods used through `dyn Trait`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Conversation orchestrator: budget, complete, append, save.
pub mod assistant;
/// Signup, login, and session identity.
pub mod auth;
/// Streams a completion and collects it into one answer.
pub mod completion;
/// Token estimation and the context budget.
pub mod context;
/// Turns and histories, with their persisted JSON form.
pub mod history;
/// Completion service providers.
pub mod llm;
/// The system instruction.
pub mod prompt;
/// Secrets loading and zeroization.
pub mod secrets;
/// Durable user records and per-identity history access.
pub mod store;

pub use assistant::{Assistant, AssistantError, Reply, TRIMMED_NOTICE};
pub use auth::{Accounts, AuthError, Credentials, SessionIdentity};
pub use completion::CompletionClient;
pub use context::{BudgetOutcome, BudgetRejection, ContextBudget, estimate_tokens};
pub use history::{History, Turn};
pub use secrets::{SecretError, SecretValue};
pub use store::{ConversationStore, MemoryUserStore, SqliteUserStore, StoreError, UserStore};
