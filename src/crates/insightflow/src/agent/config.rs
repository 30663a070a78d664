//! Agent roles and their model settings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The specialist roles in the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    DataAnalyst,
    Visualizer,
    Narrator,
    QaReviewer,
}

impl AgentRole {
    /// All roles in pipeline order.
    pub const ALL: [AgentRole; 4] = [
        AgentRole::DataAnalyst,
        AgentRole::Visualizer,
        AgentRole::Narrator,
        AgentRole::QaReviewer,
    ];

    /// Identifier used for budget categories, config keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::DataAnalyst => "data_analyst",
            AgentRole::Visualizer => "visualizer",
            AgentRole::Narrator => "narrator",
            AgentRole::QaReviewer => "qa_reviewer",
        }
    }

    /// Default system prompt for this role.
    pub fn default_system_prompt(&self) -> &'static str {
        match self {
            AgentRole::DataAnalyst => {
                "You are a data analysis specialist. You receive descriptive statistics, \
                 missing value counts and correlations computed from a tabular dataset, \
                 together with a question from a business user. Identify the patterns \
                 that matter, call out data quality problems, and answer the question \
                 using only the numbers you were given."
            }
            AgentRole::Visualizer => {
                "You are a data visualization expert. You receive the list of charts that \
                 were generated for a dataset and a short profile of its columns. \
                 Recommend which charts best communicate the findings and what additional \
                 views would help, one recommendation per line."
            }
            AgentRole::Narrator => {
                "You are a business communication expert. Turn technical findings into \
                 clear, actionable business insights in professional language. Answer \
                 with a JSON object containing the keys executive_summary (string), \
                 key_findings, business_implications, recommendations and next_steps \
                 (arrays of strings)."
            }
            AgentRole::QaReviewer => {
                "You are a quality assurance specialist. Review an analysis, its charts \
                 and its narrative for accuracy, clarity and professionalism before they \
                 reach users. Answer with a JSON object containing a suggestions array \
                 of concrete improvements; return an empty array when nothing needs to \
                 change."
            }
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            AgentRole::Narrator => "gpt-4-turbo-preview",
            _ => "gpt-3.5-turbo",
        }
    }

    fn default_temperature(&self) -> f32 {
        match self {
            AgentRole::Narrator => 0.7,
            _ => 0.3,
        }
    }

    fn default_max_tokens(&self) -> usize {
        match self {
            AgentRole::DataAnalyst | AgentRole::Visualizer => 800,
            AgentRole::Narrator => 1000,
            AgentRole::QaReviewer => 500,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model settings for one agent. Fixed once the agent is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub model_id: String,
    pub temperature: f32,
    pub system_prompt: String,
    pub max_tokens: Option<usize>,
    /// Keep the last few exchanges and replay them on the next call.
    #[serde(default)]
    pub history: bool,
}

impl AgentConfig {
    /// Defaults for `role`.
    pub fn for_role(role: AgentRole) -> Self {
        Self {
            name: role.as_str().to_string(),
            model_id: role.default_model().to_string(),
            temperature: role.default_temperature(),
            system_prompt: role.default_system_prompt().to_string(),
            max_tokens: Some(role.default_max_tokens()),
            history: false,
        }
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<usize>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_history(mut self, enabled: bool) -> Self {
        self.history = enabled;
        self
    }
}

/// Partial settings from configuration, layered over role defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentOverrides {
    pub model_id: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub system_prompt: Option<String>,
    pub history: Option<bool>,
}

impl AgentOverrides {
    pub fn apply(&self, mut config: AgentConfig) -> AgentConfig {
        if let Some(model) = &self.model_id {
            config.model_id = model.clone();
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = Some(max_tokens);
        }
        if let Some(prompt) = &self.system_prompt {
            config.system_prompt = prompt.clone();
        }
        if let Some(history) = self.history {
            config.history = history;
        }
        config
    }
}
