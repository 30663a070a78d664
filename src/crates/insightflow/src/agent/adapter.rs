//! Agent adapter
//!
//! Wraps one chat model endpoint with a fixed role and model settings. Every
//! call is admitted against the shared token budget, retried with backoff on
//! transient failures, and charged with the real usage afterwards.

use super::config::{AgentConfig, AgentRole};
use super::retry::{retry_with_backoff, RetryConfig};
use crate::budget::TokenBudgetTracker;
use crate::error::{InsightError, Result};
use llm::{ChatModel, ChatRequest, LlmError, Message};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Exchanges kept when history is enabled.
pub const MAX_HISTORY_EXCHANGES: usize = 5;

/// Result of one model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub content: String,
    pub tokens_used: u64,
    pub model: String,
}

#[derive(Debug, Clone)]
struct Exchange {
    prompt: String,
    reply: String,
}

/// A chat model bound to one agent role.
pub struct AgentAdapter {
    role: AgentRole,
    config: AgentConfig,
    model: Arc<dyn ChatModel>,
    tracker: TokenBudgetTracker,
    retry: RetryConfig,
    history: Mutex<VecDeque<Exchange>>,
}

impl fmt::Debug for AgentAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentAdapter")
            .field("role", &self.role)
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl AgentAdapter {
    pub fn new(
        role: AgentRole,
        config: AgentConfig,
        model: Arc<dyn ChatModel>,
        tracker: TokenBudgetTracker,
    ) -> Self {
        Self {
            role,
            config,
            model,
            tracker,
            retry: RetryConfig::default(),
            history: Mutex::new(VecDeque::with_capacity(MAX_HISTORY_EXCHANGES)),
        }
    }

    /// Adapter with the default settings for `role`.
    pub fn for_role(role: AgentRole, model: Arc<dyn ChatModel>, tracker: TokenBudgetTracker) -> Self {
        Self::new(role, AgentConfig::for_role(role), model, tracker)
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tracker(&self) -> &TokenBudgetTracker {
        &self.tracker
    }

    /// Send `payload` to the model under `role_prompt` (or the configured
    /// system prompt).
    ///
    /// # Errors
    ///
    /// - `QuotaExceeded` when the budget cannot cover the prompt estimate
    ///   plus `max_tokens`; the model is not called.
    /// - `Upstream` when the call still fails after retries or the model
    ///   returns an empty completion.
    pub async fn process(&self, role_prompt: Option<&str>, payload: &str) -> Result<AgentReply> {
        let system = role_prompt.unwrap_or(&self.config.system_prompt);
        let messages = self.build_messages(system, payload);
        let estimated = self.tracker.estimator().estimate_messages(&messages);
        // the hold covers the completion ceiling as well as the prompt
        let ceiling = self.config.max_tokens.map_or(0, |t| t as u64);

        let reservation = self
            .tracker
            .try_reserve(self.role.as_str(), estimated.saturating_add(ceiling))
            .map_err(|e| {
                warn!(agent = %self.role, estimated, ceiling, "Model call refused by token budget");
                e
            })?;
        debug!(agent = %self.role, reserved = reservation.amount(), "Reserved tokens for model call");

        let mut request = ChatRequest::new(messages)
            .with_model(self.config.model_id.clone())
            .with_temperature(self.config.temperature);
        if let Some(max_tokens) = self.config.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let operation = format!("{}_chat", self.role);
        let response = retry_with_backoff(&self.retry, &operation, || {
            let model = Arc::clone(&self.model);
            let request = request.clone();
            async move { model.chat(request).await }
        })
        .await
        .map_err(|e| InsightError::upstream(self.role.as_str(), e))?;

        let content = response.text().trim().to_string();
        let tokens_used = response
            .usage
            .map(|u| u.total_tokens as u64)
            .filter(|&total| total > 0)
            .unwrap_or_else(|| estimated + self.tracker.estimate(&content));

        reservation.commit(tokens_used);

        if content.is_empty() {
            return Err(InsightError::upstream(
                self.role.as_str(),
                LlmError::InvalidResponse("model returned an empty completion".to_string()),
            ));
        }

        if self.config.history {
            let mut history = self.history.lock();
            history.push_back(Exchange {
                prompt: payload.to_string(),
                reply: content.clone(),
            });
            while history.len() > MAX_HISTORY_EXCHANGES {
                history.pop_front();
            }
        }

        let model = if response.model.is_empty() {
            self.config.model_id.clone()
        } else {
            response.model
        };

        debug!(agent = %self.role, model = %model, tokens = tokens_used, "Model call completed");

        Ok(AgentReply {
            content,
            tokens_used,
            model,
        })
    }

    /// Number of exchanges currently remembered.
    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    fn build_messages(&self, system: &str, payload: &str) -> Vec<Message> {
        let mut messages = vec![Message::system(system)];

        if self.config.history {
            for exchange in self.history.lock().iter() {
                messages.push(Message::user(exchange.prompt.clone()));
                messages.push(Message::assistant(exchange.reply.clone()));
            }
        }

        messages.push(Message::user(payload));
        messages
    }
}
