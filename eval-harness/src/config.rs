//! Configuration management for the evaluation harness
//!
//! Loads oracle tolerances, runner limits, the agent under test and output
//! locations from a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use answer_oracle::Tolerances;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Tolerance bands handed to the answer oracle
    #[serde(default)]
    pub oracle: Tolerances,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Batch execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    #[serde(default = "default_parallel_requests")]
    pub parallel_requests: usize,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// How the agent under test is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// POST questions to an HTTP endpoint
    Http,
    /// Answer from the full responses recorded in an earlier log
    Replay,
}

/// Agent under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_kind")]
    pub kind: AgentKind,
    /// Recorded as `agent_type` on every evaluation record
    #[serde(default = "default_agent_name")]
    pub name: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Environment variable holding a bearer token, if the endpoint needs one
    #[serde(default)]
    pub api_key_env: String,
    /// Requests per minute
    #[serde(default = "default_rpm")]
    pub rpm: u32,
    /// Log to replay when `kind = "replay"`
    #[serde(default)]
    pub replay_file: String,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Append-only JSONL evaluation log
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_true")]
    pub save_full_response: bool,
}

// Default value functions
fn default_true() -> bool { true }
fn default_parallel_requests() -> usize { 3 }
fn default_retry_count() -> u32 { 3 }
fn default_retry_delay_ms() -> u64 { 1000 }
fn default_max_retry_delay_ms() -> u64 { 30_000 }
fn default_timeout_ms() -> u64 { 60_000 }
fn default_agent_kind() -> AgentKind { AgentKind::Http }
fn default_agent_name() -> String { "nl2sql-agent".to_string() }
fn default_endpoint() -> String { "http://127.0.0.1:8000/chat".to_string() }
fn default_rpm() -> u32 { 60 }
fn default_output_dir() -> String { "results/runs".to_string() }
fn default_log_file() -> String { "results/evaluation_log.jsonl".to_string() }

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            parallel_requests: default_parallel_requests(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            kind: default_agent_kind(),
            name: default_agent_name(),
            endpoint: default_endpoint(),
            api_key_env: String::new(),
            rpm: default_rpm(),
            replay_file: String::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            log_file: default_log_file(),
            save_full_response: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default config location or return defaults
    pub fn load_or_default() -> Self {
        let config_paths = [
            "config/eval.toml",
            "../config/eval.toml",
            "eval-harness/config/eval.toml",
        ];

        for path in &config_paths {
            match Self::from_file(path) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path);
                    return config;
                }
                Err(ConfigError::Io(_)) => continue,
                Err(e) => tracing::warn!("Ignoring {}: {}", path, e),
            }
        }

        tracing::info!("Using default configuration");
        Self::default()
    }

    /// Load from an explicit path, or fall back to [`load_or_default`](Self::load_or_default)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::load_or_default()),
        }
    }

    /// Save configuration to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let oracle = &self.oracle;
        if oracle.percentage_points.is_nan() || oracle.percentage_points < 0.0 {
            return Err(ConfigError::Invalid(
                "oracle.percentage_points must be non-negative".to_string(),
            ));
        }
        if oracle.relative.is_nan() || oracle.relative < 0.0 {
            return Err(ConfigError::Invalid("oracle.relative must be non-negative".to_string()));
        }
        if self.runner.parallel_requests == 0 {
            return Err(ConfigError::Invalid("runner.parallel_requests must be at least 1".to_string()));
        }
        if self.agent.kind == AgentKind::Replay && self.agent.replay_file.is_empty() {
            return Err(ConfigError::Invalid(
                "agent.replay_file is required when agent.kind = \"replay\"".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.oracle.percentage_points, 0.01);
        assert_eq!(config.runner.parallel_requests, 3);
        assert_eq!(config.agent.kind, AgentKind::Http);
        assert!(config.output.save_full_response);
    }

    #[test]
    fn test_parse_toml_config() {
        let toml = r#"
[oracle]
percentage_points = 5.0
count_units = ["辆"]

[runner]
parallel_requests = 8
timeout_ms = 1000

[agent]
kind = "replay"
name = "baseline"
replay_file = "results/old.jsonl"
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.oracle.percentage_points, 5.0);
        assert_eq!(config.oracle.relative, 0.05);
        assert_eq!(config.oracle.count_units, vec!["辆".to_string()]);
        assert_eq!(config.runner.parallel_requests, 8);
        assert_eq!(config.runner.retry_count, 3);
        assert_eq!(config.agent.kind, AgentKind::Replay);
        assert_eq!(config.agent.name, "baseline");
        assert_eq!(config.output.log_file, "results/evaluation_log.jsonl");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.runner.timeout_ms, 60_000);
        assert_eq!(config.agent.endpoint, "http://127.0.0.1:8000/chat");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            Config::from_toml("[runner]\nparallel_requests = 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml("[agent]\nkind = \"replay\"\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml("[runner\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = Config::from_toml(include_str!("../config/eval.toml")).unwrap();
        let defaults = Config::default();
        assert_eq!(config.oracle, defaults.oracle);
        assert_eq!(config.runner.max_retry_delay_ms, defaults.runner.max_retry_delay_ms);
        assert_eq!(config.agent.rpm, defaults.agent.rpm);
        assert_eq!(config.output.output_dir, defaults.output.output_dir);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.toml");
        let mut config = Config::default();
        config.agent.name = "candidate".to_string();
        config.save_toml(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.agent.name, "candidate");
        assert_eq!(loaded.oracle, config.oracle);
    }
}
