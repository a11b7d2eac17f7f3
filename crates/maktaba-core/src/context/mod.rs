//! Context budgeting — token estimation and history trimming.
//!
//! Every model call goes through the same two steps:
//!
//! 1. **Estimate** — text cost is approximated as its number of
//!    whitespace-delimited segments ([`estimate_tokens`]).
//! 2. **Budget** — a query that is too long on its own is rejected outright;
//!    otherwise the oldest turns are evicted one at a time until history plus
//!    query fits the ceiling ([`ContextBudget::apply`]).
//!
//! ```text
//! query ──▶ per-request check ──▶ evict oldest while over ceiling ──▶ Accepted
//!                 │                            │
//!                 ▼                            ▼
//!           QueryTooLong           HistoryAndQueryTooLong
//! ```

pub mod budget;
pub mod estimator;

pub use budget::{BudgetOutcome, BudgetRejection, ContextBudget};
pub use estimator::estimate_tokens;
