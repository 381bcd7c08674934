//! Evaluation records and the append-only evaluation log

pub mod extract;
pub mod log;

pub use extract::extract_answer;
pub use log::{next_run_number, EvaluationLog, LogError};

use answer_oracle::AnswerOracle;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::QaPair;

/// Characters dropped from a question before fingerprinting, besides ASCII
/// punctuation and whitespace
const FULLWIDTH_PUNCTUATION: &[char] = &['，', '。', '！', '？', '；', '：'];

/// Normalized question text used to match records across runs
pub fn fingerprint(question: &str) -> String {
    question
        .chars()
        .filter(|c| {
            !(c.is_ascii_punctuation()
                || c.is_ascii_whitespace()
                || *c == '\x0b'
                || FULLWIDTH_PUNCTUATION.contains(c))
        })
        .collect::<String>()
        .to_lowercase()
}

/// Current time in the format stored on records
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// One judged answer, persisted as a JSON line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// 1-based question index
    #[serde(default)]
    pub id: usize,
    #[serde(default)]
    pub timestamp: String,
    pub question: String,
    #[serde(default)]
    pub question_fingerprint: String,
    /// 1-based, per fingerprint and agent type
    #[serde(default = "default_run_number")]
    pub run_number: u32,
    pub standard_answer: String,
    pub actual_answer: String,
    pub is_correct: bool,
    #[serde(default)]
    pub comparison_reason: String,
    #[serde(default)]
    pub agent_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_response: Option<String>,
    /// Verdict before the last re-evaluation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_correct: Option<bool>,
}

fn default_run_number() -> u32 { 1 }

impl EvaluationRecord {
    /// Judge an agent's full response to a question
    pub fn judge(
        pair: &QaPair,
        full_response: &str,
        agent_type: &str,
        run_number: u32,
        oracle: &AnswerOracle,
    ) -> Self {
        let actual_answer = extract_answer(full_response);
        let result = oracle.compare(&pair.standard_answer, &actual_answer);

        Self {
            id: pair.index,
            timestamp: timestamp_now(),
            question: pair.question.clone(),
            question_fingerprint: fingerprint(&pair.question),
            run_number,
            standard_answer: pair.standard_answer.clone(),
            actual_answer,
            is_correct: result.matched,
            comparison_reason: result.reason,
            agent_type: agent_type.to_string(),
            full_response: Some(full_response.to_string()),
            original_correct: None,
        }
    }

    /// Re-run the oracle on the stored answers; returns whether the verdict flipped
    pub fn rejudge(&mut self, oracle: &AnswerOracle) -> bool {
        let result = oracle.compare(&self.standard_answer, &self.actual_answer);
        let changed = result.matched != self.is_correct;
        self.is_correct = result.matched;
        self.comparison_reason = result.reason;
        changed
    }

    /// Fill fields older logs may lack
    pub(crate) fn normalize(&mut self) {
        if self.question_fingerprint.is_empty() {
            self.question_fingerprint = fingerprint(&self.question);
        }
    }
}
