//! Accuracy statistics over evaluation records

use std::collections::{BTreeMap, HashMap};

use answer_oracle::extract;
use serde::{Deserialize, Serialize};

use crate::dataset::QuestionCategory;
use crate::evaluation::EvaluationRecord;

/// Most recent distinct questions counted per agent
pub const LATEST_WINDOW: usize = 100;

/// Relative difference above which a wrong number is blamed on data selection
const DATA_FILTER_RATIO: f64 = 0.2;

/// Correct/total counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub total: usize,
    pub correct: usize,
    /// Percent, 0 when there are no records
    pub accuracy: f64,
}

impl AccuracyStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a EvaluationRecord>) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.add(record.is_correct);
        }
        stats
    }

    pub fn add(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
        self.accuracy = self.correct as f64 / self.total as f64 * 100.0;
    }

    pub fn failed(&self) -> usize {
        self.total - self.correct
    }
}

/// Likely cause of a wrong answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Far off, or no number at all: the wrong rows were selected
    DataFilter,
    /// Close to the expected number: arithmetic or rounding went wrong
    Calculation,
    Other,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::DataFilter => "data_filter",
            FailureKind::Calculation => "calculation",
            FailureKind::Other => "other",
        }
    }

    /// Categorize a wrong answer by its first numbers
    pub fn categorize(standard: &str, actual: &str) -> Self {
        let std_num = extract(standard).numeric;
        let act_num = extract(actual).numeric;

        match (std_num, act_num) {
            (Some(s), Some(_)) if s == 0.0 => FailureKind::Calculation,
            (Some(s), Some(a)) => {
                if (s - a).abs() / s.abs() > DATA_FILTER_RATIO {
                    FailureKind::DataFilter
                } else {
                    FailureKind::Calculation
                }
            }
            (Some(_), None) => FailureKind::DataFilter,
            _ => FailureKind::Other,
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which oracle rule produced a verdict, from the start of its reason
pub fn reason_kind(reason: &str) -> &'static str {
    const PREFIXES: &[(&str, &str)] = &[
        ("answer empty", "answer empty"),
        ("entity", "entity set"),
        ("time series", "time series"),
        ("period", "time series"),
        ("percentage", "percentage"),
        ("numeric", "numeric"),
        ("text", "text"),
    ];
    PREFIXES
        .iter()
        .find(|(prefix, _)| reason.starts_with(prefix))
        .map(|(_, kind)| *kind)
        .unwrap_or("other")
}

/// A wrong answer kept for the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedQuestion {
    pub id: usize,
    pub question: String,
    pub standard_answer: String,
    pub actual_answer: String,
    pub reason: String,
    pub kind: FailureKind,
}

/// Statistics for one agent type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSummary {
    /// Every record of the agent, repeats included
    pub all_runs: AccuracyStats,
    /// Latest record per question, most recent [`LATEST_WINDOW`] questions
    pub latest: AccuracyStats,
    pub by_category: BTreeMap<QuestionCategory, AccuracyStats>,
    pub failure_kinds: BTreeMap<FailureKind, usize>,
    pub reason_kinds: BTreeMap<String, usize>,
    /// Sorted by question id
    pub failures: Vec<FailedQuestion>,
}

/// Best agent by latest accuracy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Agent(String),
    Tie,
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Winner::Agent(name) => write!(f, "{}", name),
            Winner::Tie => write!(f, "tie"),
        }
    }
}

/// Statistics over a whole evaluation log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub overall: AccuracyStats,
    pub by_agent: BTreeMap<String, AgentSummary>,
    pub winner: Option<Winner>,
}

/// Latest record per fingerprint, newest first, capped at `limit`
pub fn latest_per_question<'a>(records: &[&'a EvaluationRecord], limit: usize) -> Vec<&'a EvaluationRecord> {
    let mut latest: HashMap<&str, &'a EvaluationRecord> = HashMap::new();
    for &record in records {
        match latest.get(record.question_fingerprint.as_str()) {
            Some(existing) if existing.timestamp >= record.timestamp => {}
            _ => {
                latest.insert(record.question_fingerprint.as_str(), record);
            }
        }
    }

    let mut latest: Vec<_> = latest.into_values().collect();
    latest.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));
    latest.truncate(limit);
    latest
}

/// Summarize a log
pub fn summarize(records: &[EvaluationRecord]) -> RunSummary {
    let mut grouped: BTreeMap<&str, Vec<&EvaluationRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.agent_type.as_str()).or_default().push(record);
    }

    let by_agent: BTreeMap<String, AgentSummary> = grouped
        .into_iter()
        .map(|(agent, records)| (agent.to_string(), summarize_agent(&records)))
        .collect();

    let winner = pick_winner(&by_agent);

    RunSummary {
        overall: AccuracyStats::from_records(records),
        by_agent,
        winner,
    }
}

fn summarize_agent(records: &[&EvaluationRecord]) -> AgentSummary {
    let latest = latest_per_question(records, LATEST_WINDOW);
    let mut summary = AgentSummary {
        all_runs: AccuracyStats::from_records(records.iter().copied()),
        latest: AccuracyStats::from_records(latest.iter().copied()),
        ..AgentSummary::default()
    };

    for record in &latest {
        summary
            .by_category
            .entry(QuestionCategory::classify(&record.question))
            .or_default()
            .add(record.is_correct);

        if record.is_correct {
            continue;
        }

        let kind = FailureKind::categorize(&record.standard_answer, &record.actual_answer);
        *summary.failure_kinds.entry(kind).or_default() += 1;
        *summary
            .reason_kinds
            .entry(reason_kind(&record.comparison_reason).to_string())
            .or_default() += 1;
        summary.failures.push(FailedQuestion {
            id: record.id,
            question: record.question.clone(),
            standard_answer: record.standard_answer.clone(),
            actual_answer: record.actual_answer.clone(),
            reason: record.comparison_reason.clone(),
            kind,
        });
    }

    summary.failures.sort_by_key(|f| f.id);
    summary
}

fn pick_winner(by_agent: &BTreeMap<String, AgentSummary>) -> Option<Winner> {
    let mut ranked: Vec<(&String, f64)> = by_agent
        .iter()
        .filter(|(_, s)| s.latest.total > 0)
        .map(|(name, s)| (name, s.latest.accuracy))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    match ranked.as_slice() {
        [] => None,
        [(only, _)] => Some(Winner::Agent((*only).clone())),
        [(first, best), (_, second), ..] if best > second => Some(Winner::Agent((*first).clone())),
        _ => Some(Winner::Tie),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(agent: &str, id: usize, question: &str, correct: bool, ts: &str) -> EvaluationRecord {
        EvaluationRecord {
            id,
            timestamp: ts.to_string(),
            question: question.to_string(),
            question_fingerprint: crate::evaluation::fingerprint(question),
            run_number: 1,
            standard_answer: "100".to_string(),
            actual_answer: if correct { "100" } else { "150" }.to_string(),
            is_correct: correct,
            comparison_reason: if correct {
                "numeric match: 100 == 100".to_string()
            } else {
                "numeric mismatch: 100 vs 150 (Δ 50, tolerance 5)".to_string()
            },
            agent_type: agent.to_string(),
            full_response: None,
            original_correct: None,
        }
    }

    #[test]
    fn test_accuracy_stats() {
        let empty = AccuracyStats::default();
        assert_eq!(empty.accuracy, 0.0);

        let mut stats = AccuracyStats::default();
        stats.add(true);
        stats.add(false);
        stats.add(true);
        stats.add(true);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.accuracy, 75.0);
    }

    #[test]
    fn test_failure_kind() {
        assert_eq!(FailureKind::categorize("100 辆", "150 辆"), FailureKind::DataFilter);
        assert_eq!(FailureKind::categorize("100 辆", "110 辆"), FailureKind::Calculation);
        assert_eq!(FailureKind::categorize("0", "3"), FailureKind::Calculation);
        assert_eq!(FailureKind::categorize("-11.56%", "-12%"), FailureKind::Calculation);
        assert_eq!(FailureKind::categorize("4045", "无数据"), FailureKind::DataFilter);
        assert_eq!(FailureKind::categorize("比亚迪", "吉利"), FailureKind::Other);
    }

    #[test]
    fn test_reason_kind() {
        assert_eq!(reason_kind("numeric mismatch: 1 vs 2"), "numeric");
        assert_eq!(reason_kind("entity set mismatch: missing entity: A"), "entity set");
        assert_eq!(reason_kind("entity parse failed, text mismatch: 'a' vs 'b'"), "entity set");
        assert_eq!(reason_kind("time series mismatch: period sequence [] vs []"), "time series");
        assert_eq!(reason_kind("answer empty: actual"), "answer empty");
        assert_eq!(reason_kind("数值不匹配"), "other");
    }

    #[test]
    fn test_latest_per_question() {
        let records = vec![
            record("nl2sql", 1, "Q1", false, "2026-01-01T00:00:00Z"),
            record("nl2sql", 1, "Q1", true, "2026-01-02T00:00:00Z"),
            record("nl2sql", 2, "Q2", false, "2026-01-01T12:00:00Z"),
        ];
        let refs: Vec<&EvaluationRecord> = records.iter().collect();
        let latest = latest_per_question(&refs, 10);
        assert_eq!(latest.len(), 2);
        assert!(latest[0].is_correct);
        assert_eq!(latest[1].id, 2);

        assert_eq!(latest_per_question(&refs, 1).len(), 1);
    }

    #[test]
    fn test_latest_window_caps_questions() {
        let records: Vec<EvaluationRecord> = (0..120)
            .map(|i| {
                let ts = format!("2026-01-01T00:{:02}:{:02}Z", i / 60, i % 60);
                record("nl2sql", i + 1, &format!("Q{}", i), i >= 20, &ts)
            })
            .collect();
        let summary = summarize(&records);
        let agent = &summary.by_agent["nl2sql"];
        assert_eq!(agent.all_runs.total, 120);
        assert_eq!(agent.latest.total, LATEST_WINDOW);
        // the 20 failures are the oldest and fall outside the window
        assert_eq!(agent.latest.correct, LATEST_WINDOW);
    }

    #[test]
    fn test_summarize_and_winner() {
        let records = vec![
            record("nl2sql", 1, "每个月的销量", true, "t1"),
            record("nl2sql", 2, "哪个品牌最高", true, "t2"),
            record("baseline", 1, "每个月的销量", false, "t3"),
            record("baseline", 2, "哪个品牌最高", true, "t4"),
        ];
        let summary = summarize(&records);

        assert_eq!(summary.overall.total, 4);
        assert_eq!(summary.overall.correct, 3);
        assert_eq!(summary.winner, Some(Winner::Agent("nl2sql".to_string())));

        let baseline = &summary.by_agent["baseline"];
        assert_eq!(baseline.latest.accuracy, 50.0);
        assert_eq!(baseline.failure_kinds[&FailureKind::DataFilter], 1);
        assert_eq!(baseline.reason_kinds["numeric"], 1);
        assert_eq!(baseline.failures.len(), 1);
        assert_eq!(baseline.by_category[&QuestionCategory::MonthlyBreakdown].correct, 0);
        assert_eq!(baseline.by_category[&QuestionCategory::Ranking].correct, 1);
    }

    #[test]
    fn test_winner_edge_cases() {
        assert_eq!(summarize(&[]).winner, None);

        let one = vec![record("nl2sql", 1, "Q", false, "t")];
        assert_eq!(summarize(&one).winner, Some(Winner::Agent("nl2sql".to_string())));

        let tied = vec![
            record("nl2sql", 1, "Q", true, "t1"),
            record("baseline", 1, "Q", true, "t2"),
        ];
        assert_eq!(summarize(&tied).winner, Some(Winner::Tie));
    }
}
