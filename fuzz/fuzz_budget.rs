//! Fuzz target for the context budget.
//!
//! Run with: cargo +nightly fuzz run fuzz_budget
//!
//! The first two bytes pick the ceilings; the rest is split into lines, the
//! first being the query and the remainder alternating question/answer.

#![no_main]

use libfuzzer_sys::fuzz_target;
use maktaba_core::{BudgetOutcome, BudgetRejection, ContextBudget, History, Turn, estimate_tokens};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let per_request = data[0] as usize + 1;
    let ceiling = per_request + data[1] as usize * 4;
    let text = String::from_utf8_lossy(&data[2..]);

    let mut lines = text.split('\n');
    let query = lines.next().unwrap_or("");
    let rest: Vec<&str> = lines.collect();
    let turns: Vec<Turn> = rest
        .chunks(2)
        .map(|pair| Turn::new(pair[0], pair.get(1).copied().unwrap_or("")))
        .collect();
    let original = History::from(turns.clone());

    let budget = ContextBudget::new(ceiling, per_request);
    let query_cost = estimate_tokens(query);

    match budget.apply(original, query) {
        BudgetOutcome::Accepted { history, was_trimmed } => {
            assert!(query_cost <= per_request);
            assert!(history.estimated_tokens() + query_cost <= ceiling);
            // Only the oldest turns are removed.
            let kept = history.turns();
            assert_eq!(kept, &turns[turns.len() - kept.len()..]);
            assert_eq!(was_trimmed, kept.len() < turns.len());
        }
        BudgetOutcome::Rejected(BudgetRejection::QueryTooLong) => {
            assert!(query_cost > per_request);
        }
        BudgetOutcome::Rejected(BudgetRejection::HistoryAndQueryTooLong) => {
            assert!(query_cost > ceiling);
        }
    }
});
