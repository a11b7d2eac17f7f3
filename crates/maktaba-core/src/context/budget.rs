//! Context budget — per-request limit and oldest-first history trimming.
//!
//! The budget has two ceilings:
//!
//! - **Per-request ceiling** — the most a single query may cost on its own.
//!   Checked first; a query over it is rejected before history is looked at.
//! - **Ceiling** — the most history plus query may cost together. Turns are
//!   evicted from the front, one at a time, until the total fits. Evicted
//!   turns are gone for good.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::History;

use super::estimator::estimate_tokens;

/// Default combined ceiling for history plus query.
pub const DEFAULT_CEILING: usize = 1500;

/// Default ceiling for a single query.
pub const DEFAULT_PER_REQUEST_CEILING: usize = 300;

/// Why a request was refused by the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum BudgetRejection {
    /// The query alone exceeds the per-request ceiling.
    #[error("Your question is too long. Please ask in fewer words.")]
    QueryTooLong,

    /// Even with every turn evicted, the query exceeds the ceiling.
    #[error(
        "Your question and conversation history exceed the allowed limit. Please ask a shorter question."
    )]
    HistoryAndQueryTooLong,
}

/// Result of budgeting one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BudgetOutcome {
    /// The request fits. `history` is the (possibly shortened) history to
    /// send; `was_trimmed` is true iff at least one turn was evicted.
    Accepted { history: History, was_trimmed: bool },
    /// The request cannot be served.
    Rejected(BudgetRejection),
}

impl BudgetOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// The token budget applied before every completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    /// Maximum combined estimate of history plus query.
    pub ceiling: usize,
    /// Maximum estimate of a query on its own.
    pub per_request_ceiling: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CEILING,
            per_request_ceiling: DEFAULT_PER_REQUEST_CEILING,
        }
    }
}

impl From<&maktaba_config::BudgetConfig> for ContextBudget {
    fn from(config: &maktaba_config::BudgetConfig) -> Self {
        Self {
            ceiling: config.ceiling,
            per_request_ceiling: config.per_request_ceiling,
        }
    }
}

impl ContextBudget {
    pub fn new(ceiling: usize, per_request_ceiling: usize) -> Self {
        Self {
            ceiling,
            per_request_ceiling,
        }
    }

    /// Check a query against the per-request ceiling only.
    pub fn check_query(&self, query: &str) -> Result<usize, BudgetRejection> {
        let cost = estimate_tokens(query);
        if cost > self.per_request_ceiling {
            Err(BudgetRejection::QueryTooLong)
        } else {
            Ok(cost)
        }
    }

    /// Budget `query` against `history`.
    ///
    /// Eviction is strictly oldest-first, one turn at a time, and stops as
    /// soon as the running total is within the ceiling.
    pub fn apply(&self, mut history: History, query: &str) -> BudgetOutcome {
        let query_cost = match self.check_query(query) {
            Ok(cost) => cost,
            Err(rejection) => return BudgetOutcome::Rejected(rejection),
        };

        let mut total = history.estimated_tokens() + query_cost;
        let mut evicted = 0;
        for turn in history.iter() {
            if total <= self.ceiling {
                break;
            }
            total -= turn.estimated_tokens();
            evicted += 1;
        }

        if total > self.ceiling {
            debug!(
                query_tokens = query_cost,
                ceiling = self.ceiling,
                "query exceeds ceiling with empty history"
            );
            return BudgetOutcome::Rejected(BudgetRejection::HistoryAndQueryTooLong);
        }

        if evicted > 0 {
            debug!(evicted, remaining_tokens = total, "trimmed oldest turns");
            history.evict_oldest(evicted);
        }

        BudgetOutcome::Accepted {
            history,
            was_trimmed: evicted > 0,
        }
    }
}

impl fmt::Display for ContextBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tokens total, {} per request",
            self.ceiling, self.per_request_ceiling
        )
    }
}
