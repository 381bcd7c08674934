//! HTTP client for agents exposing a question/answer endpoint

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use super::traits::{AgentError, AgentResult, AnswerAgent};
use crate::config::AgentConfig;
use crate::dataset::QaPair;
use crate::runner::rate_limiter::RateLimiter;

/// Response fields checked for the answer text, in order
const ANSWER_FIELDS: &[&str] = &["response", "answer", "content"];
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Agent reached by POSTing `{question, session_id}` as JSON
pub struct HttpAgent {
    agent_type: String,
    endpoint: String,
    api_key: Option<String>,
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
}

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    session_id: String,
}

impl HttpAgent {
    pub fn new(agent_type: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            endpoint: endpoint.into(),
            api_key: None,
            http_client: Client::new(),
            rate_limiter: Arc::new(RateLimiter::new(60)),
        }
    }

    /// Build from the `[agent]` config section
    pub fn from_config(config: &AgentConfig) -> AgentResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(AgentError::Config("agent.endpoint is empty".to_string()));
        }

        let mut agent = Self::new(&config.name, &config.endpoint).with_rate_limit(config.rpm);
        if !config.api_key_env.is_empty() {
            let key = std::env::var(&config.api_key_env).map_err(|_| {
                AgentError::Config(format!("{} not set", config.api_key_env))
            })?;
            agent = agent.with_api_key(key);
        }
        Ok(agent)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set requests per minute
    pub fn with_rate_limit(mut self, rpm: u32) -> Self {
        self.rate_limiter = Arc::new(RateLimiter::new(rpm));
        self
    }

    /// A fresh session per question keeps agent context from leaking between questions
    fn session_id(question: &QaPair) -> String {
        format!("eval_{}_{}", question.index, Utc::now().format("%H%M%S_%6f"))
    }
}

/// Answer text from a JSON response body
fn answer_text(body: &serde_json::Value) -> AgentResult<String> {
    if let Some(text) = body.as_str() {
        return Ok(text.to_string());
    }
    ANSWER_FIELDS
        .iter()
        .find_map(|field| body.get(field).and_then(|v| v.as_str()))
        .map(String::from)
        .ok_or_else(|| {
            AgentError::Parse(format!(
                "response has none of the fields {}",
                ANSWER_FIELDS.join("/")
            ))
        })
}

#[async_trait]
impl AnswerAgent for HttpAgent {
    fn name(&self) -> &str {
        &self.endpoint
    }

    fn agent_type(&self) -> &str {
        &self.agent_type
    }

    async fn answer(&self, question: &QaPair) -> AgentResult<String> {
        self.rate_limiter.acquire().await;

        let start = Instant::now();
        let body = AskRequest {
            question: &question.question,
            session_id: Self::session_id(question),
        };

        let mut request = self.http_client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
                * 1000;
            return Err(AgentError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;
        let text = answer_text(&json)?;

        tracing::debug!(
            "Question {} answered by {} in {}ms",
            question.index,
            self.endpoint,
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the raw request
    async fn serve_once(
        status_line: &'static str,
        extra_headers: &'static str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/chat", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            if k.eq_ignore_ascii_case("content-length") {
                                v.trim().parse::<usize>().ok()
                            } else {
                                None
                            }
                        })
                        .unwrap_or(0);
                    if raw.len() >= head_end + 4 + length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
                status_line,
                body.len(),
                extra_headers,
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });

        (url, handle)
    }

    #[test]
    fn test_answer_text_fields() {
        assert_eq!(answer_text(&json!({"response": "a"})).unwrap(), "a");
        assert_eq!(answer_text(&json!({"answer": "b", "content": "c"})).unwrap(), "b");
        assert_eq!(answer_text(&json!("plain")).unwrap(), "plain");
        assert!(matches!(answer_text(&json!({"text": 1})), Err(AgentError::Parse(_))));
    }

    #[test]
    fn test_from_config_requires_key_env() {
        let config = AgentConfig {
            api_key_env: "EVAL_HARNESS_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..AgentConfig::default()
        };
        assert!(matches!(HttpAgent::from_config(&config), Err(AgentError::Config(_))));

        let config = AgentConfig {
            endpoint: " ".to_string(),
            ..AgentConfig::default()
        };
        assert!(matches!(HttpAgent::from_config(&config), Err(AgentError::Config(_))));

        let agent = HttpAgent::from_config(&AgentConfig::default()).unwrap();
        assert_eq!(agent.agent_type(), "nl2sql-agent");
    }

    #[tokio::test]
    async fn test_posts_question_and_reads_answer() {
        let body = json!({"response": "分析完成\n【答案：4045 辆】"}).to_string();
        let (url, server) = serve_once("HTTP/1.1 200 OK", "", body).await;

        let agent = HttpAgent::new("nl2sql", url).with_api_key("secret");
        let pair = QaPair::new(3, "全年销量是多少？", "4045 辆");
        let text = agent.answer(&pair).await.unwrap();
        assert_eq!(text, "分析完成\n【答案：4045 辆】");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /chat"));
        assert!(request.to_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains("全年销量是多少？"));
        assert!(request.contains("\"session_id\":\"eval_3_"));
    }

    #[tokio::test]
    async fn test_rate_limited_status() {
        let (url, server) =
            serve_once("HTTP/1.1 429 Too Many Requests", "Retry-After: 2\r\n", "{}".to_string()).await;
        let agent = HttpAgent::new("nl2sql", url);
        let err = agent.answer(&QaPair::new(1, "Q", "A")).await.unwrap_err();
        assert!(matches!(err, AgentError::RateLimited { retry_after_ms: 2000 }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let (url, server) =
            serve_once("HTTP/1.1 500 Internal Server Error", "", "\"boom\"".to_string()).await;
        let agent = HttpAgent::new("nl2sql", url);
        match agent.answer(&QaPair::new(1, "Q", "A")).await {
            Err(AgentError::Api { status, message }) => {
                assert_eq!(status, 500);
                assert!(message.contains("boom"));
            }
            other => panic!("expected API error, got {:?}", other),
        }
        server.await.unwrap();
    }
}
