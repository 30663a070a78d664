//! Token estimation
//!
//! Cheap character-based estimates used for budget admission before a model
//! call. The provider's reported usage replaces the estimate afterwards.

use llm::Message;
use serde_json::Value;

/// Characters per token for GPT-family models.
pub const CHARS_PER_TOKEN: usize = 4;

/// Deterministic token estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEstimator {
    chars_per_token: usize,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(CHARS_PER_TOKEN)
    }
}

impl TokenEstimator {
    /// Create an estimator with a fixed divisor (clamped to at least 1).
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    pub fn chars_per_token(&self) -> usize {
        self.chars_per_token
    }

    /// Estimate tokens for a piece of text.
    pub fn estimate(&self, text: &str) -> u64 {
        self.from_chars(text.chars().count())
    }

    /// Estimate tokens for a full prompt.
    pub fn estimate_messages(&self, messages: &[Message]) -> u64 {
        let chars = messages.iter().map(|m| m.content.chars().count()).sum();
        self.from_chars(chars)
    }

    /// Estimate tokens for a JSON value as it would be sent on the wire.
    pub fn estimate_json(&self, value: &Value) -> u64 {
        self.estimate(&value.to_string())
    }

    fn from_chars(&self, chars: usize) -> u64 {
        (chars / self.chars_per_token) as u64
    }
}
