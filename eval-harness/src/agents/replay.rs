//! Agent that replays responses recorded in an earlier evaluation log

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use super::traits::{AgentError, AgentResult, AnswerAgent};
use crate::dataset::QaPair;
use crate::evaluation::{fingerprint, EvaluationLog, EvaluationRecord, LogError};

/// Answers each question with the latest recorded response for its fingerprint.
///
/// Lets a changed oracle or answer key be re-run over past agent output
/// without contacting the agent.
pub struct ReplayAgent {
    agent_type: String,
    source: String,
    responses: HashMap<String, (String, String)>,
}

impl ReplayAgent {
    pub fn from_records(agent_type: impl Into<String>, records: &[EvaluationRecord]) -> Self {
        let mut responses: HashMap<String, (String, String)> = HashMap::new();

        for record in records {
            // records without the raw response still carry the extracted answer
            let response = record
                .full_response
                .clone()
                .unwrap_or_else(|| format!("【答案：{}】", record.actual_answer));

            match responses.get(&record.question_fingerprint) {
                Some((timestamp, _)) if *timestamp > record.timestamp => {}
                _ => {
                    responses.insert(
                        record.question_fingerprint.clone(),
                        (record.timestamp.clone(), response),
                    );
                }
            }
        }

        Self {
            agent_type: agent_type.into(),
            source: "records".to_string(),
            responses,
        }
    }

    /// Load recorded responses from a log file
    pub fn from_log(agent_type: impl Into<String>, path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref();
        let records = EvaluationLog::new(path).read_all()?;
        let mut agent = Self::from_records(agent_type, &records);
        agent.source = path.display().to_string();
        tracing::info!("Replaying {} recorded questions from {}", agent.len(), agent.source);
        Ok(agent)
    }

    /// Number of distinct questions with a recorded response
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

#[async_trait]
impl AnswerAgent for ReplayAgent {
    fn name(&self) -> &str {
        &self.source
    }

    fn agent_type(&self) -> &str {
        &self.agent_type
    }

    async fn answer(&self, question: &QaPair) -> AgentResult<String> {
        self.responses
            .get(&fingerprint(&question.question))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| AgentError::NotRecorded(question.question.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use answer_oracle::AnswerOracle;

    fn recorded(question: &str, response: &str, timestamp: &str) -> EvaluationRecord {
        let pair = QaPair::new(1, question, "4045");
        let mut record =
            EvaluationRecord::judge(&pair, response, "nl2sql", 1, &AnswerOracle::default());
        record.timestamp = timestamp.to_string();
        record
    }

    #[tokio::test]
    async fn test_latest_response_wins() {
        let records = vec![
            recorded("全年销量？", "【答案：4046】", "2026-01-15T10:00:00.000000Z"),
            recorded("全年销量？", "【答案：4045】", "2026-01-16T10:00:00.000000Z"),
            recorded("全年销量？", "【答案：1】", "2026-01-14T10:00:00.000000Z"),
        ];
        let agent = ReplayAgent::from_records("replay", &records);
        assert_eq!(agent.len(), 1);

        // fingerprint match ignores punctuation
        let answer = agent.answer(&QaPair::new(5, "全年销量", "4045")).await.unwrap();
        assert_eq!(answer, "【答案：4045】");
    }

    #[tokio::test]
    async fn test_missing_question() {
        let agent = ReplayAgent::from_records("replay", &[]);
        assert!(agent.is_empty());
        let err = agent.answer(&QaPair::new(1, "Q", "A")).await.unwrap_err();
        assert!(matches!(err, AgentError::NotRecorded(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_record_without_full_response() {
        let mut record = recorded("Q", "x", "t");
        record.full_response = None;
        record.actual_answer = "4045 辆".to_string();
        let agent = ReplayAgent::from_records("replay", &[record]);
        let answer = agent.answer(&QaPair::new(1, "Q", "4045")).await.unwrap();
        assert_eq!(crate::evaluation::extract_answer(&answer), "4045 辆");
    }

    #[test]
    fn test_from_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        EvaluationLog::new(&path)
            .append(&recorded("Q", "【答案：4045】", "t"))
            .unwrap();
        let agent = ReplayAgent::from_log("replay", &path).unwrap();
        assert_eq!(agent.len(), 1);
        assert_eq!(agent.name(), path.display().to_string());
    }
}
