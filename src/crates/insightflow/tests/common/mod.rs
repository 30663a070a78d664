//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use insightflow::agent::RetryConfig;
use insightflow::{AgentRole, Supervisor, SupervisorConfig, TokenBudgetTracker};
use llm::{ChatModel, ChatRequest, ChatResponse, LlmError, UsageMetadata};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Tokens reported for every scripted reply.
pub const TOKENS_PER_CALL: u64 = 30;

/// Chat model answering per agent role.
///
/// The role is recognised from the default system prompt, so every
/// specialist must run with its default prompt.
pub struct ScriptedModel {
    replies: Mutex<HashMap<AgentRole, Result<String, String>>>,
    calls: Mutex<HashMap<AgentRole, usize>>,
}

impl ScriptedModel {
    /// Replies that make every stage succeed and QA pass.
    pub fn passing() -> Self {
        let model = Self {
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        };
        model
            .reply(AgentRole::DataAnalyst, "Category x appears twice; a rises steadily.")
            .reply(
                AgentRole::Visualizer,
                r#"{"recommendations": ["Show a as a line over row order"]}"#,
            )
            .reply(
                AgentRole::Narrator,
                &json!({
                    "executive_summary": "x is the dominant category.",
                    "key_findings": ["x covers two of three rows"],
                    "business_implications": ["Demand concentrates on x"],
                    "recommendations": ["Prioritise x inventory"],
                    "next_steps": ["Collect a larger sample"]
                })
                .to_string(),
            )
            .reply(AgentRole::QaReviewer, r#"{"suggestions": ["Mention the small sample size"]}"#)
    }

    pub fn reply(self, role: AgentRole, text: &str) -> Self {
        self.replies.lock().insert(role, Ok(text.to_string()));
        self
    }

    /// Make every call for `role` fail with a provider error.
    pub fn fail(self, role: AgentRole, message: &str) -> Self {
        self.replies.lock().insert(role, Err(message.to_string()));
        self
    }

    pub fn calls(&self, role: AgentRole) -> usize {
        self.calls.lock().get(&role).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: ChatRequest) -> llm::Result<ChatResponse> {
        let system = request
            .messages
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let role = AgentRole::ALL
            .into_iter()
            .find(|role| role.default_system_prompt() == system)
            .ok_or_else(|| LlmError::InvalidRequest("unknown system prompt".to_string()))?;

        *self.calls.lock().entry(role).or_insert(0) += 1;

        match self.replies.lock().get(&role).cloned() {
            Some(Ok(text)) => Ok(ChatResponse::new("scripted", text).with_usage(UsageMetadata::new(20, 10))),
            Some(Err(message)) => Err(LlmError::InvalidRequest(message)),
            None => Err(LlmError::InvalidRequest(format!("no reply scripted for {}", role))),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Supervisor with retries off so failures surface immediately.
pub fn supervisor(model: Arc<ScriptedModel>, tracker: TokenBudgetTracker, config: SupervisorConfig) -> Supervisor {
    Supervisor::new(model, tracker, config.with_retry(RetryConfig::disabled()))
}

/// The three-row sample: one numeric column `a`, one categorical column `b`.
pub fn sample_dataset() -> Value {
    json!({"data": [{"a": 1, "b": "x"}, {"a": 2, "b": "y"}, {"a": 3, "b": "x"}]})
}
