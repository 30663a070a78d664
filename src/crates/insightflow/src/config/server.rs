//! Server configuration for insightflow-server
//!
//! Loads and parses insightflow.toml. Every section is optional and falls
//! back to its defaults.

use crate::agent::{AgentConfig, AgentOverrides, AgentRole, RetryConfig};
use crate::budget::DEFAULT_DAILY_LIMIT;
use crate::specialists::{QaScoring, QaThresholds};
use crate::supervisor::{SupervisorConfig, DEFAULT_MAX_DATASET_ROWS, DEFAULT_WORKFLOW_TIMEOUT};
use llm::RemoteLlmConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name searched for in the standard locations.
pub const CONFIG_FILE_NAME: &str = "insightflow.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Server identification and bind address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Server name reported by the health endpoint
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            name: "insightflow-server".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl ServerSection {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Language-model endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// OpenAI-compatible API root
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Model used when an agent does not name one
    pub default_model: String,
    pub timeout_secs: u64,
    pub organization: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            default_model: "gpt-3.5-turbo".to_string(),
            timeout_secs: 300,
            organization: None,
        }
    }
}

impl LlmSection {
    /// Client settings with the key read through `lookup`.
    pub fn remote_config(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<RemoteLlmConfig, ConfigError> {
        let api_key = lookup(&self.api_key_env)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::InvalidConfig(format!("{} is not set", self.api_key_env)))?;

        let mut remote = RemoteLlmConfig::new(api_key, self.base_url.clone(), self.default_model.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(org) = &self.organization {
            remote = remote.with_organization(org.clone());
        }
        Ok(remote)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetSection {
    /// Tokens allowed per rolling day
    pub daily_limit: u64,
}

impl Default for BudgetSection {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowSection {
    /// Upper bound on one analysis run
    pub timeout_secs: u64,
    pub max_dataset_rows: usize,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_WORKFLOW_TIMEOUT.as_secs(),
            max_dataset_rows: DEFAULT_MAX_DATASET_ROWS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaSection {
    pub thresholds: QaThresholds,
    pub scoring: QaScoring,
}

/// Complete server configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub llm: LlmSection,
    pub budget: BudgetSection,
    pub retry: RetryConfig,
    pub workflow: WorkflowSection,
    pub qa: QaSection,
    /// Per-role overrides, keyed by role name (`data_analyst`, ...)
    pub agents: BTreeMap<AgentRole, AgentOverrides>,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from an explicit path or the standard locations
    ///
    /// Searches for config in:
    /// 1. `explicit`, usually from `--config` or INSIGHTFLOW_CONFIG
    /// 2. CONFIG_PATH environment variable
    /// 3. ./config/insightflow.toml
    /// 4. ../config/insightflow.toml (for development)
    /// 5. ./insightflow.toml
    ///
    /// Falls back to defaults when no file is found. A path that was named
    /// explicitly must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        if let Ok(config_path) = std::env::var("CONFIG_PATH") {
            return Self::from_file(config_path);
        }

        match Self::standard_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    fn standard_paths() -> [PathBuf; 3] {
        [
            Path::new("config").join(CONFIG_FILE_NAME),
            Path::new("../config").join(CONFIG_FILE_NAME),
            PathBuf::from(CONFIG_FILE_NAME),
        ]
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply DAILY_TOKEN_LIMIT, HOST, PORT and OPENAI_API_BASE from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(limit) = lookup("DAILY_TOKEN_LIMIT") {
            self.budget.daily_limit = limit
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidConfig(format!("DAILY_TOKEN_LIMIT is not a number: {}", limit)))?;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidConfig(format!("PORT is not a valid port: {}", port)))?;
        }
        if let Some(base) = lookup("OPENAI_API_BASE") {
            self.llm.base_url = base;
        }
        Ok(())
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.budget.daily_limit == 0 {
            return Err(ConfigError::InvalidConfig("budget.daily_limit must be positive".to_string()));
        }
        if self.workflow.timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig("workflow.timeout_secs must be positive".to_string()));
        }
        if self.workflow.max_dataset_rows == 0 {
            return Err(ConfigError::InvalidConfig("workflow.max_dataset_rows must be positive".to_string()));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("llm.base_url must not be empty".to_string()));
        }

        let thresholds = &self.qa.thresholds;
        for (name, value) in [
            ("min_clarity", thresholds.min_clarity),
            ("min_accuracy", thresholds.min_accuracy),
            ("min_actionability", thresholds.min_actionability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidConfig(format!(
                    "qa.thresholds.{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }

        for (role, overrides) in &self.agents {
            if let Some(t) = overrides.temperature {
                if !(0.0..=2.0).contains(&t) {
                    return Err(ConfigError::InvalidConfig(format!(
                        "agents.{}.temperature must be between 0 and 2, got {}",
                        role, t
                    )));
                }
            }
        }

        Ok(())
    }

    /// Agent settings for `role`: role defaults with any overrides applied.
    pub fn agent_config(&self, role: AgentRole) -> AgentConfig {
        let defaults = AgentConfig::for_role(role);
        match self.agents.get(&role) {
            Some(overrides) => overrides.apply(defaults),
            None => defaults,
        }
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        let mut config = SupervisorConfig::default()
            .with_retry(self.retry.clone())
            .with_qa_thresholds(self.qa.thresholds)
            .with_qa_scoring(self.qa.scoring)
            .with_timeout(Duration::from_secs(self.workflow.timeout_secs))
            .with_max_dataset_rows(self.workflow.max_dataset_rows);
        for role in AgentRole::ALL {
            config = config.with_agent(role, self.agent_config(role));
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specialists::QualityScores;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.budget.daily_limit, 10_000);
        assert_eq!(config.server.bind_address(), "127.0.0.1:8000");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.qa.scoring, QaScoring::Computed);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_parsing() {
        let toml_content = r#"
[server]
name = "analytics"
port = 9000

[budget]
daily_limit = 50000

[retry]
max_retries = 1
initial_backoff_ms = 200

[qa.thresholds]
min_accuracy = 0.9

[qa.scoring]
mode = "fixed"
clarity = 0.85
accuracy = 0.9
actionability = 0.8

[agents.narrator]
model_id = "gpt-4o"
history = true
"#;

        let config = AppConfig::from_str(toml_content).unwrap();
        assert_eq!(config.server.name, "analytics");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.budget.daily_limit, 50_000);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.max_backoff_ms, 60_000);
        assert_eq!(config.qa.thresholds.min_accuracy, 0.9);
        assert_eq!(config.qa.thresholds.min_clarity, 0.7);
        assert_eq!(
            config.qa.scoring,
            QaScoring::Fixed(QualityScores {
                clarity: 0.85,
                accuracy: 0.9,
                actionability: 0.8
            })
        );

        let narrator = config.agent_config(AgentRole::Narrator);
        assert_eq!(narrator.model_id, "gpt-4o");
        assert_eq!(narrator.temperature, 0.7);
        assert!(narrator.history);

        let analyst = config.agent_config(AgentRole::DataAnalyst);
        assert_eq!(analyst, AgentConfig::for_role(AgentRole::DataAnalyst));
    }

    #[test]
    fn test_unknown_agent_field_is_rejected() {
        let err = AppConfig::from_str("[agents.visualizer]\nmodel = \"gpt-4\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(lookup(&[
                ("DAILY_TOKEN_LIMIT", "2500"),
                ("HOST", "0.0.0.0"),
                ("PORT", "8080"),
                ("OPENAI_API_BASE", "http://localhost:11434/v1"),
            ]))
            .unwrap();

        assert_eq!(config.budget.daily_limit, 2500);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_bad_env_override() {
        let mut config = AppConfig::default();
        let err = config.apply_overrides(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.budget.daily_limit = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.qa.thresholds.min_clarity = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agents.insert(
            AgentRole::Narrator,
            AgentOverrides {
                temperature: Some(3.0),
                ..AgentOverrides::default()
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[budget]\ndaily_limit = 123").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.budget.daily_limit, 123);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_remote_config_requires_key() {
        let llm = LlmSection::default();
        assert!(llm.remote_config(lookup(&[])).is_err());
        assert!(llm.remote_config(lookup(&[("OPENAI_API_KEY", "  ")])).is_err());

        let remote = llm.remote_config(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(remote.model, "gpt-3.5-turbo");
        assert_eq!(remote.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_supervisor_config_carries_sections() {
        let config = AppConfig::from_str("[workflow]\ntimeout_secs = 30\n[agents.qa_reviewer]\nmax_tokens = 200").unwrap();
        let supervisor = config.supervisor_config();

        assert_eq!(supervisor.timeout, Duration::from_secs(30));
        assert_eq!(supervisor.agents[&AgentRole::QaReviewer].max_tokens, Some(200));
        assert_eq!(supervisor.agents.len(), 4);
    }
}
