//! Results reporting

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::analysis::{AccuracyStats, ChangedVerdict, ReevaluationSummary, RunSummary, Winner};

/// JSON summary export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSummary {
    pub run_id: String,
    pub timestamp: String,
    pub total_records: usize,
    pub overall_accuracy: f64,
    pub agent_rankings: Vec<AgentRanking>,
    pub category_breakdown: BTreeMap<String, CategoryLeader>,
    pub winner: Option<Winner>,
    pub log_file: String,
}

/// Agent ranking in summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRanking {
    pub agent_type: String,
    pub all_runs: AccuracyStats,
    pub latest: AccuracyStats,
    pub failure_kinds: BTreeMap<String, usize>,
}

/// Category leader info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryLeader {
    pub leader: String,
    pub accuracy: f64,
    pub margin: f64,
}

impl JsonSummary {
    /// Create from a run summary
    pub fn from_summary(
        run_id: impl Into<String>,
        summary: &RunSummary,
        log_file: impl Into<String>,
    ) -> Self {
        let mut rankings: Vec<AgentRanking> = summary
            .by_agent
            .iter()
            .map(|(agent, s)| AgentRanking {
                agent_type: agent.clone(),
                all_runs: s.all_runs,
                latest: s.latest,
                failure_kinds: s
                    .failure_kinds
                    .iter()
                    .map(|(kind, &n)| (kind.to_string(), n))
                    .collect(),
            })
            .collect();

        rankings.sort_by(|a, b| {
            b.latest
                .accuracy
                .partial_cmp(&a.latest.accuracy)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut by_category: BTreeMap<String, Vec<(&str, f64)>> = BTreeMap::new();
        for (agent, s) in &summary.by_agent {
            for (category, stats) in &s.by_category {
                by_category
                    .entry(category.to_string())
                    .or_default()
                    .push((agent.as_str(), stats.accuracy));
            }
        }

        let category_breakdown = by_category
            .into_iter()
            .filter_map(|(category, mut agents)| {
                agents.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
                let (leader, accuracy) = *agents.first()?;
                let margin = agents.get(1).map_or(0.0, |(_, second)| accuracy - second);
                Some((
                    category,
                    CategoryLeader {
                        leader: leader.to_string(),
                        accuracy,
                        margin,
                    },
                ))
            })
            .collect();

        Self {
            run_id: run_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            total_records: summary.overall.total,
            overall_accuracy: summary.overall.accuracy,
            agent_rankings: rankings,
            category_breakdown,
            winner: summary.winner.clone(),
            log_file: log_file.into(),
        }
    }

    /// Write to JSON file, creating the parent directory
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
    }
}

fn stats_line(stats: &AccuracyStats) -> String {
    format!("{:.1}% ({}/{})", stats.accuracy, stats.correct, stats.total)
}

/// Cut long answers for one-line display
fn clip(text: &str, max_chars: usize) -> String {
    let text = text.replace('\n', " ");
    if text.chars().count() <= max_chars {
        text
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

/// Generate a console report; up to `failures` wrong answers are listed per agent
pub fn print_console_report(summary: &RunSummary, failures: usize) {
    println!("\n=== Answer Evaluation Results ===\n");
    println!("Total Records: {}", summary.overall.total);
    println!("Overall Accuracy: {}\n", stats_line(&summary.overall));

    println!("Agent Accuracy:");
    println!("{:-<50}", "");

    let mut rankings: Vec<_> = summary.by_agent.iter().collect();
    rankings.sort_by(|a, b| {
        b.1.latest
            .accuracy
            .partial_cmp(&a.1.latest.accuracy)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for (i, (agent, s)) in rankings.iter().enumerate() {
        println!(
            "  {}. {} - Latest: {}, All runs: {}",
            i + 1,
            agent,
            stats_line(&s.latest),
            stats_line(&s.all_runs)
        );
    }

    if let Some(winner) = &summary.winner {
        if summary.by_agent.len() > 1 {
            println!("\n  Winner: {}", winner);
        }
    }

    for (agent, s) in &summary.by_agent {
        if s.by_category.is_empty() {
            continue;
        }
        println!("\nAccuracy by Category ({}):", agent);
        println!("{:-<50}", "");
        for (category, stats) in &s.by_category {
            println!("  {:<20} {}", category.to_string(), stats_line(stats));
        }

        if !s.failure_kinds.is_empty() {
            println!("\nFailure Causes ({}):", agent);
            println!("{:-<50}", "");
            for (kind, count) in &s.failure_kinds {
                println!("  {:<20} {}", kind.to_string(), count);
            }
            for (kind, count) in &s.reason_kinds {
                println!("  rule: {:<14} {}", kind, count);
            }
        }

        if failures > 0 && !s.failures.is_empty() {
            println!("\nFailed Questions ({}):", agent);
            println!("{:-<50}", "");
            for failed in s.failures.iter().take(failures) {
                println!("  #{} [{}] {}", failed.id, failed.kind, clip(&failed.question, 60));
                println!("    expected: {}", clip(&failed.standard_answer, 80));
                println!("    actual:   {}", clip(&failed.actual_answer, 80));
                println!("    reason:   {}", failed.reason);
            }
            if s.failures.len() > failures {
                println!("  ... {} more", s.failures.len() - failures);
            }
        }
    }

    println!("\n{:=<50}", "");
}

fn print_changes(changed: &[ChangedVerdict]) {
    for change in changed {
        let direction = if change.after { "wrong -> correct" } else { "correct -> wrong" };
        println!("  #{} {}: {}", change.id, direction, clip(&change.question, 60));
        println!("    {}", change.reason);
    }
}

/// Console report for a re-evaluation
pub fn print_reevaluation_report(summary: &ReevaluationSummary) {
    println!("\n=== Re-evaluation Results ===\n");
    println!("Records: {}", summary.records.len());
    println!("Before: {}", stats_line(&summary.accuracy_before));
    println!("After:  {}", stats_line(&summary.accuracy_after));
    println!(
        "Change: {:+.1} points",
        summary.accuracy_after.accuracy - summary.accuracy_before.accuracy
    );

    if !summary.changed.is_empty() {
        println!("\nChanged Verdicts ({}):", summary.changed.len());
        println!("{:-<50}", "");
        print_changes(&summary.changed);
    }

    println!("\n{:=<50}", "");
}

/// Console listing of verdicts flipped by an answer refresh
pub fn print_flipped(changed: &[ChangedVerdict]) {
    if changed.is_empty() {
        return;
    }
    println!("\nFlipped Verdicts ({}):", changed.len());
    println!("{:-<50}", "");
    print_changes(changed);
}
