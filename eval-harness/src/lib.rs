//! Evaluation harness for data-query agents
//!
//! Asks an agent every question of a question/answer set, judges each
//! answer against the standard answer with [`answer_oracle`], and keeps an
//! append-only JSONL log of the verdicts.
//!
//! # Features
//!
//! - Bounded-parallel execution with retries, timeouts and rate limiting
//! - HTTP agents, or replay of responses recorded in an earlier log
//! - Accuracy by agent and question category, with likely failure causes
//! - Re-judging old logs after the oracle or the answer key changes
//! - Console and JSON summaries
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use answer_oracle::AnswerOracle;
//! use eval_harness::{
//!     agents::HttpAgent,
//!     analysis::summarize,
//!     dataset::load_qa_pairs,
//!     evaluation::EvaluationLog,
//!     reporting::print_console_report,
//!     runner::{Executor, ExecutorConfig},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pairs = load_qa_pairs("questions.txt")?;
//!     let agent = Arc::new(HttpAgent::new("nl2sql", "http://127.0.0.1:8000/chat"));
//!     let log = EvaluationLog::new("results/evaluation_log.jsonl");
//!
//!     let history = log.read_existing()?;
//!     let executor = Executor::new(agent, AnswerOracle::default(), ExecutorConfig::default());
//!     let records = executor.execute(&pairs, &history).await;
//!     log.append_all(&records)?;
//!
//!     print_console_report(&summarize(&records), 10);
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod analysis;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod reporting;
pub mod runner;

pub use config::Config;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::agents::{create_agent, AgentError, AgentResult, AnswerAgent, HttpAgent, ReplayAgent};
    pub use crate::analysis::{
        merge_runs, reevaluate, refresh_standard_answers, summarize, AccuracyStats, AgentSummary,
        FailureKind, RunSummary, Winner,
    };
    pub use crate::config::{AgentConfig, AgentKind, Config, OutputConfig, RunnerConfig};
    pub use crate::dataset::{load_qa_pairs, QaPair, QuestionCategory};
    pub use crate::evaluation::{extract_answer, fingerprint, EvaluationLog, EvaluationRecord};
    pub use crate::reporting::{print_console_report, JsonSummary};
    pub use crate::runner::{ConsoleProgress, Executor, ExecutorConfig, ProgressCallback};
}
