//! Async batch executor for asking an agent every question of a run

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use answer_oracle::AnswerOracle;

use crate::agents::{AgentError, AgentResult, AnswerAgent};
use crate::config::RunnerConfig;
use crate::dataset::QaPair;
use crate::evaluation::{fingerprint, next_run_number, EvaluationRecord};

/// Configuration for the executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum questions in flight at once
    pub parallel_requests: usize,
    /// Number of retries on failure
    pub retry_count: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds
    pub max_retry_delay_ms: u64,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Keep the agent's raw output on each record
    pub save_full_response: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from(&RunnerConfig::default())
    }
}

impl From<&RunnerConfig> for ExecutorConfig {
    fn from(runner: &RunnerConfig) -> Self {
        Self {
            parallel_requests: runner.parallel_requests.max(1),
            retry_count: runner.retry_count,
            retry_delay_ms: runner.retry_delay_ms,
            max_retry_delay_ms: runner.max_retry_delay_ms,
            timeout_ms: runner.timeout_ms,
            save_full_response: true,
        }
    }
}

/// Executor for running a question set against one agent
pub struct Executor {
    config: ExecutorConfig,
    agent: Arc<dyn AnswerAgent>,
    oracle: Arc<AnswerOracle>,
    semaphore: Arc<Semaphore>,
    progress: Arc<dyn ProgressCallback>,
}

impl Executor {
    /// Create a new executor
    pub fn new(agent: Arc<dyn AnswerAgent>, oracle: AnswerOracle, config: ExecutorConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.parallel_requests.max(1)));
        Self {
            config,
            agent,
            oracle: Arc::new(oracle),
            semaphore,
            progress: Arc::new(NoOpProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Ask every question and judge the answers.
    ///
    /// `history` holds records already in the log; run numbers continue from
    /// it. The returned records are sorted by question index.
    pub async fn execute(&self, pairs: &[QaPair], history: &[EvaluationRecord]) -> Vec<EvaluationRecord> {
        let run_numbers = assign_run_numbers(pairs, history, self.agent.agent_type());
        let total = pairs.len();
        let mut handles = Vec::with_capacity(total);

        for (pair, run_number) in pairs.iter().cloned().zip(run_numbers) {
            let executor = self.clone_for_task();
            handles.push(tokio::spawn(async move {
                executor.execute_question(&pair, run_number).await
            }));
        }

        let mut records = Vec::with_capacity(total);
        for (completed, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(record) => records.push(record),
                Err(e) => tracing::error!("Question task panicked: {}", e),
            }
            self.progress.on_progress(completed + 1, total);
        }

        records.sort_by_key(|r| r.id);
        records
    }

    /// Ask one question, retrying as configured, and judge the response
    pub async fn execute_question(&self, pair: &QaPair, run_number: u32) -> EvaluationRecord {
        let _permit = self.semaphore.acquire().await.ok();
        self.progress.on_question_start(pair);

        let response = match self.ask_with_retry(pair).await {
            Ok(text) => text,
            Err(e @ AgentError::Timeout { .. }) => format!("[TIMEOUT] {}", e),
            Err(e) => format!("[ERROR] {}", e),
        };

        let mut record = EvaluationRecord::judge(
            pair,
            &response,
            self.agent.agent_type(),
            run_number,
            &self.oracle,
        );
        if !self.config.save_full_response {
            record.full_response = None;
        }

        self.progress.on_question_complete(&record);
        record
    }

    async fn ask_with_retry(&self, pair: &QaPair) -> AgentResult<String> {
        let mut last_error = None;
        let mut delay = self.config.retry_delay_ms;

        for attempt in 0..=self.config.retry_count {
            if attempt > 0 {
                tracing::info!(
                    "Retry {} for question {} on {}",
                    attempt,
                    pair.index,
                    self.agent.name()
                );
                sleep(Duration::from_millis(delay)).await;
                delay = next_delay(delay, self.config.max_retry_delay_ms);
            }

            match self.try_answer(pair).await {
                Ok(text) => return Ok(text),
                Err(AgentError::RateLimited { retry_after_ms }) => {
                    tracing::warn!(
                        "Rate limited on {}, waiting {}ms",
                        self.agent.name(),
                        retry_after_ms
                    );
                    sleep(Duration::from_millis(retry_after_ms)).await;
                    last_error = Some(AgentError::RateLimited { retry_after_ms });
                }
                Err(e) if !e.is_retryable() => {
                    tracing::error!("Question {} failed on {}: {}", pair.index, self.agent.name(), e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        "Error on {} for question {} (attempt {}): {}",
                        self.agent.name(),
                        pair.index,
                        attempt + 1,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(AgentError::Timeout {
            timeout_ms: self.config.timeout_ms,
        }))
    }

    /// Single attempt bounded by the configured timeout
    async fn try_answer(&self, pair: &QaPair) -> AgentResult<String> {
        let timeout = Duration::from_millis(self.config.timeout_ms);

        match tokio::time::timeout(timeout, self.agent.answer(pair)).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }),
        }
    }

    /// Clone the executor for spawning tasks
    fn clone_for_task(&self) -> Self {
        Self {
            config: self.config.clone(),
            agent: self.agent.clone(),
            oracle: self.oracle.clone(),
            semaphore: self.semaphore.clone(),
            progress: self.progress.clone(),
        }
    }
}

/// Exponential backoff step, capped at `max_ms`
fn next_delay(delay_ms: u64, max_ms: u64) -> u64 {
    delay_ms.saturating_mul(2).min(max_ms)
}

/// Run number for each pair, continuing from `history` and counting repeats
/// within the batch
fn assign_run_numbers(pairs: &[QaPair], history: &[EvaluationRecord], agent_type: &str) -> Vec<u32> {
    let mut issued: HashMap<String, u32> = HashMap::new();

    pairs
        .iter()
        .map(|pair| {
            let fp = fingerprint(&pair.question);
            let next = match issued.get(&fp) {
                Some(last) => last + 1,
                None => next_run_number(history, &fp, agent_type),
            };
            issued.insert(fp, next);
            next
        })
        .collect()
}

/// Progress callback for tracking execution
pub trait ProgressCallback: Send + Sync {
    fn on_question_start(&self, pair: &QaPair);
    fn on_question_complete(&self, record: &EvaluationRecord);
    fn on_progress(&self, completed: usize, total: usize);
}

/// Default no-op progress callback
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_question_start(&self, _pair: &QaPair) {}
    fn on_question_complete(&self, _record: &EvaluationRecord) {}
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

/// Console progress callback
pub struct ConsoleProgress;

impl ProgressCallback for ConsoleProgress {
    fn on_question_start(&self, pair: &QaPair) {
        let preview: String = pair.question.chars().take(60).collect();
        println!("  [{}] Asking: {}", pair.index, preview);
    }

    fn on_question_complete(&self, record: &EvaluationRecord) {
        if record.is_correct {
            println!("  [{}] OK   | {}", record.id, record.comparison_reason);
        } else {
            println!("  [{}] FAIL | {}", record.id, record.comparison_reason);
            println!("        standard: {}", record.standard_answer);
            println!("        actual:   {}", record.actual_answer);
        }
    }

    fn on_progress(&self, completed: usize, total: usize) {
        if completed == total || completed % 10 == 0 {
            println!("Progress: {}/{} questions complete", completed, total);
        }
    }
}
