//! Agent trait definitions for systems under evaluation

use async_trait::async_trait;

use crate::dataset::QaPair;

/// Error types for agent calls
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No recorded response for question: {0}")]
    NotRecorded(String),
}

impl AgentError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AgentError::Config(_) | AgentError::NotRecorded(_))
    }
}

pub type AgentResult<T> = Result<T, AgentError>;

/// A data-query agent that answers natural-language questions
#[async_trait]
pub trait AnswerAgent: Send + Sync {
    /// Human-readable identity, used in logs
    fn name(&self) -> &str;

    /// Label stored as `agent_type` on evaluation records
    fn agent_type(&self) -> &str;

    /// Ask one question and return the agent's full response text
    async fn answer(&self, question: &QaPair) -> AgentResult<String>;
}
