//! Conversation history — turns and the ordered sequence that owns them.
//!
//! A [`Turn`] is one question/answer exchange and never changes once
//! created. A [`History`] only grows at the back (a new turn) and shrinks at
//! the front (eviction by the context budget).
//!
//! The serialized form is a JSON array of two-element arrays,
//! `[["question", "answer"], ...]`, which is what the user store persists.

use serde::{Deserialize, Serialize};

use crate::context::estimate_tokens;

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Turn {
    question: String,
    answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Estimated size of both sides of the exchange.
    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.question) + estimate_tokens(&self.answer)
    }
}

impl From<(String, String)> for Turn {
    fn from((question, answer): (String, String)) -> Self {
        Self { question, answer }
    }
}

impl From<Turn> for (String, String) {
    fn from(turn: Turn) -> Self {
        (turn.question, turn.answer)
    }
}

/// An ordered sequence of turns, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a new turn at the back.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Remove the `count` oldest turns.
    pub(crate) fn evict_oldest(&mut self, count: usize) {
        self.turns.drain(..count.min(self.turns.len()));
    }

    /// Sum of the estimated size of every turn.
    pub fn estimated_tokens(&self) -> usize {
        self.turns.iter().map(Turn::estimated_tokens).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse the persisted JSON form. Blank input is an empty history.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(json)
    }
}

impl From<Vec<Turn>> for History {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

impl FromIterator<Turn> for History {
    fn from_iter<I: IntoIterator<Item = Turn>>(iter: I) -> Self {
        Self {
            turns: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}
