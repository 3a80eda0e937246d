//! Model formulas.
//!
//! A [`Formula`] is the structural description of one sub-model's linear
//! predictor: the response column, the additive predictor terms, and any
//! `offset(...)` columns injected without an estimated coefficient. The
//! deductible adjustment enters the refit frequency model through
//! [`Formula::push_offset`].

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    pub response: String,
    pub terms: Vec<String>,
    pub offsets: Vec<String>,
}

impl Formula {
    pub fn new(response: impl Into<String>, terms: &[&str]) -> Self {
        Self {
            response: response.into(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
            offsets: Vec::new(),
        }
    }

    /// Appends an additive offset term referencing `column`.
    ///
    /// Duplicate offsets are collapsed so repeated refits stay idempotent.
    pub fn push_offset(&mut self, column: &str) {
        if !self.offsets.iter().any(|c| c == column) {
            self.offsets.push(column.to_string());
        }
    }

    /// Builder-style variant of [`Formula::push_offset`].
    pub fn with_offset(mut self, column: &str) -> Self {
        self.push_offset(column);
        self
    }

    /// True when `column` already participates as an offset.
    pub fn has_offset(&self, column: &str) -> bool {
        self.offsets.iter().any(|c| c == column)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rhs = self
            .terms
            .iter()
            .cloned()
            .chain(self.offsets.iter().map(|c| format!("offset({c})")))
            .join(" + ");
        if rhs.is_empty() {
            write!(f, "{} ~ 1", self.response)
        } else {
            write!(f, "{} ~ {}", self.response, rhs)
        }
    }
}
