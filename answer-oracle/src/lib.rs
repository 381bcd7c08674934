//! Answer Oracle - equivalence of free-text data-query answers
//!
//! Decides whether an answer produced by a data-query agent states the same
//! fact as a canonical reference answer, and explains why. Both inputs are
//! free text, so the oracle classifies the reference into an
//! [`AnswerShape`] and applies the tolerance rule for that shape.
//!
//! # Example
//!
//! ```rust
//! use answer_oracle::{compare, AnswerShape};
//!
//! let result = compare("一汽大众: 9533 辆, 比亚迪: 31140 辆", "比亚迪: 31140 辆; 一汽大众: 9533 辆");
//! assert!(result.matched);
//! assert_eq!(result.shape, Some(AnswerShape::EntitySet));
//!
//! let result = compare("4045 辆", "4046");
//! assert!(!result.matched);
//! ```

mod classify;
mod extract;
mod matcher;
mod reason;
mod types;

pub use classify::classify;
pub use extract::{
    count_unit, extract, extract_percentage, is_period_label, labelled_segments, split_segments,
    ParseFailure,
};
pub use matcher::{rule_for, Rule};
pub use reason::{Band, EntityIssue, Reason, Side, TextCheck, ValueCheck};
pub use types::{
    AnswerShape, ComparisonResult, EntityValue, ExtractedValue, TimePoint, Tolerances,
    DEFAULT_COUNT_UNITS, DEFAULT_PERCENTAGE_POINTS, DEFAULT_RELATIVE,
};

use std::sync::LazyLock;

static DEFAULT_ORACLE: LazyLock<AnswerOracle> = LazyLock::new(AnswerOracle::default);

/// Compares answers under a fixed set of tolerances.
///
/// Holds no mutable state; one oracle can be shared across threads and
/// reused for every record of a run.
#[derive(Debug, Clone, Default)]
pub struct AnswerOracle {
    tolerances: Tolerances,
}

impl AnswerOracle {
    pub fn new(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Compare a canonical answer with an agent's answer.
    pub fn compare(&self, standard: &str, actual: &str) -> ComparisonResult {
        let (shape, reason) = self.evaluate(standard, actual);
        ComparisonResult {
            matched: reason.matched(),
            reason: reason.to_string(),
            shape,
        }
    }

    /// Like [`compare`](Self::compare), but returns the structured reason.
    pub fn judge(&self, standard: &str, actual: &str) -> Reason {
        self.evaluate(standard, actual).1
    }

    fn evaluate(&self, standard: &str, actual: &str) -> (Option<AnswerShape>, Reason) {
        if standard.is_empty() {
            return (None, Reason::EmptyAnswer(Side::Standard));
        }
        if actual.is_empty() {
            return (None, Reason::EmptyAnswer(Side::Actual));
        }

        let shape = classify(standard, actual);
        let reason = rule_for(shape)(&self.tolerances, standard, actual);
        tracing::debug!(
            shape = %shape,
            matched = reason.matched(),
            reason = %reason,
            "compared answers"
        );
        (Some(shape), reason)
    }
}

/// Compare two answers with the default tolerances.
pub fn compare(standard: &str, actual: &str) -> ComparisonResult {
    DEFAULT_ORACLE.compare(standard, actual)
}
