//! Agents under evaluation

pub mod http;
pub mod replay;
pub mod traits;

pub use http::HttpAgent;
pub use replay::ReplayAgent;
pub use traits::{AgentError, AgentResult, AnswerAgent};

use std::sync::Arc;

use crate::config::{AgentConfig, AgentKind};

/// Create the configured agent
pub fn create_agent(config: &AgentConfig) -> AgentResult<Arc<dyn AnswerAgent>> {
    match config.kind {
        AgentKind::Http => Ok(Arc::new(HttpAgent::from_config(config)?)),
        AgentKind::Replay => {
            if config.replay_file.is_empty() {
                return Err(AgentError::Config("agent.replay_file is not set".to_string()));
            }
            let agent = ReplayAgent::from_log(&config.name, &config.replay_file)
                .map_err(|e| AgentError::Config(format!("{}: {}", config.replay_file, e)))?;
            Ok(Arc::new(agent))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_http_agent() {
        let agent = create_agent(&AgentConfig::default()).unwrap();
        assert_eq!(agent.agent_type(), "nl2sql-agent");
        assert_eq!(agent.name(), "http://127.0.0.1:8000/chat");
    }

    #[test]
    fn test_create_replay_agent_needs_file() {
        let config = AgentConfig {
            kind: AgentKind::Replay,
            ..AgentConfig::default()
        };
        assert!(matches!(create_agent(&config), Err(AgentError::Config(_))));

        let config = AgentConfig {
            kind: AgentKind::Replay,
            replay_file: "/nonexistent/eval-harness/log.jsonl".to_string(),
            ..AgentConfig::default()
        };
        assert!(matches!(create_agent(&config), Err(AgentError::Config(_))));
    }
}
