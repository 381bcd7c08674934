//! Re-judging recorded answers after the oracle or the answer key changes

use std::collections::HashMap;

use answer_oracle::AnswerOracle;
use serde::{Deserialize, Serialize};

use super::metrics::AccuracyStats;
use crate::dataset::QaPair;
use crate::evaluation::{fingerprint, EvaluationRecord};

/// A record whose verdict flipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedVerdict {
    pub id: usize,
    pub question: String,
    pub before: bool,
    pub after: bool,
    pub reason: String,
}

impl ChangedVerdict {
    fn of(record: &EvaluationRecord, before: bool) -> Self {
        Self {
            id: record.id,
            question: record.question.clone(),
            before,
            after: record.is_correct,
            reason: record.comparison_reason.clone(),
        }
    }
}

/// Outcome of [`reevaluate`]
#[derive(Debug, Clone)]
pub struct ReevaluationSummary {
    pub records: Vec<EvaluationRecord>,
    pub changed: Vec<ChangedVerdict>,
    pub accuracy_before: AccuracyStats,
    pub accuracy_after: AccuracyStats,
}

/// Re-judge every record, remembering the previous verdict in `original_correct`
pub fn reevaluate(mut records: Vec<EvaluationRecord>, oracle: &AnswerOracle) -> ReevaluationSummary {
    let accuracy_before = AccuracyStats::from_records(&records);
    let mut changed = Vec::new();

    for record in &mut records {
        let before = record.is_correct;
        record.original_correct = Some(before);
        if record.rejudge(oracle) {
            tracing::debug!("Record {} flipped {} -> {}", record.id, before, record.is_correct);
            changed.push(ChangedVerdict::of(record, before));
        }
    }

    ReevaluationSummary {
        accuracy_after: AccuracyStats::from_records(&records),
        records,
        changed,
        accuracy_before,
    }
}

/// Outcome of [`refresh_standard_answers`]
#[derive(Debug, Clone, Default)]
pub struct RefreshSummary {
    /// Records whose question is in the answer key
    pub matched: usize,
    /// Records whose standard answer was replaced
    pub updated: usize,
    pub flipped: Vec<ChangedVerdict>,
}

/// Standard answers keyed by question fingerprint
pub fn answer_key(pairs: &[QaPair]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|p| (fingerprint(&p.question), p.standard_answer.clone()))
        .collect()
}

/// Replace stale standard answers and re-judge the affected records.
///
/// With `agent_filter`, only records of that agent type are touched.
pub fn refresh_standard_answers(
    records: &mut [EvaluationRecord],
    answers: &HashMap<String, String>,
    agent_filter: Option<&str>,
    oracle: &AnswerOracle,
) -> RefreshSummary {
    let mut summary = RefreshSummary::default();

    for record in records.iter_mut() {
        if agent_filter.is_some_and(|agent| agent != record.agent_type) {
            continue;
        }
        let Some(answer) = answers.get(&record.question_fingerprint) else {
            continue;
        };
        summary.matched += 1;
        if *answer == record.standard_answer {
            continue;
        }

        summary.updated += 1;
        let before = record.is_correct;
        record.standard_answer = answer.clone();
        if record.rejudge(oracle) {
            summary.flipped.push(ChangedVerdict::of(record, before));
        }
    }

    summary
}
