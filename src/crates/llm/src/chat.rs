//! The `ChatModel` trait and its request/response types.
//!
//! A `ChatModel` turns a list of messages plus generation settings into a
//! single completion. Providers implement it; callers hold it as
//! `Arc<dyn ChatModel>` so one client can be shared across agents and tasks.

use crate::error::Result;
use crate::messages::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request for a single chat completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The conversation messages to send to the model.
    pub messages: Vec<Message>,

    /// Model identifier. Falls back to the provider's configured model when `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Upper bound on generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

impl ChatRequest {
    /// Create a new chat request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Target a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature for generation.
    ///
    /// Lower values (0.0-0.3) keep answers focused; higher values trade
    /// consistency for variety.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the number of generated tokens.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

impl UsageMetadata {
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

/// A completed chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The assistant message.
    pub message: Message,

    /// Usage reported by the provider, if any.
    pub usage: Option<UsageMetadata>,

    /// Model that produced the answer.
    pub model: String,

    /// Provider specific extras such as `finish_reason`.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ChatResponse {
    /// Response with the given text and no usage information.
    pub fn new(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(text),
            usage: None,
            model: model.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_usage(mut self, usage: UsageMetadata) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Completion text.
    pub fn text(&self) -> &str {
        self.message.text()
    }
}

/// A chat completion endpoint.
///
/// Implementations must be `Send + Sync`; share them with `Arc<dyn ChatModel>`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce one completion for `request`.
    ///
    /// Network failures, non-success statuses and unreadable bodies are
    /// reported through [`LlmError`](crate::LlmError) so callers can decide
    /// whether to retry.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Model used when a request does not name one.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = ChatRequest::new(vec![Message::system("sys"), Message::user("hi")])
            .with_model("gpt-3.5-turbo")
            .with_temperature(0.3)
            .with_max_tokens(800);

        assert_eq!(request.model.as_deref(), Some("gpt-3.5-turbo"));
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.max_tokens, Some(800));
    }

    #[test]
    fn test_usage_total() {
        let usage = UsageMetadata::new(12, 30);
        assert_eq!(usage.total_tokens, 42);
    }

    #[test]
    fn test_response_text() {
        let response = ChatResponse::new("gpt-4", "done").with_usage(UsageMetadata::new(1, 2));
        assert_eq!(response.text(), "done");
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(3));
    }
}
