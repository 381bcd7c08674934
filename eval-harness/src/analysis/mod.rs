//! Analysis of evaluation logs

pub mod merge;
pub mod metrics;
pub mod reevaluate;

pub use merge::merge_runs;
pub use metrics::{
    latest_per_question, reason_kind, summarize, AccuracyStats, AgentSummary, FailedQuestion,
    FailureKind, RunSummary, Winner, LATEST_WINDOW,
};
pub use reevaluate::{
    answer_key, reevaluate, refresh_standard_answers, ChangedVerdict, ReevaluationSummary,
    RefreshSummary,
};
