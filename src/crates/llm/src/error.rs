//! Error types for chat model providers.

use thiserror::Error;

/// Result type for chat model operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when talking to a chat model endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to serialize/deserialize data.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// API authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// API key not found in environment.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Model not found or unavailable.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Provider returned a 5xx status.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response could not be interpreted.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request timeout.
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Any other non-success answer from the provider.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::HttpError(_)
                | LlmError::ServiceUnavailable(_)
                | LlmError::Timeout(_)
                | LlmError::RateLimitExceeded(_)
        )
    }

    /// Check if this error is due to authentication.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            LlmError::AuthenticationError(_) | LlmError::ApiKeyNotFound(_)
        )
    }

    /// Errors that will fail the same way no matter how often they are retried.
    pub fn is_permanent(&self) -> bool {
        self.is_auth_error()
            || matches!(
                self,
                LlmError::ModelNotFound(_)
                    | LlmError::InvalidRequest(_)
                    | LlmError::ConfigError(_)
                    | LlmError::SerializationError(_)
            )
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::Timeout("slow".into()).is_retryable());
        assert!(LlmError::RateLimitExceeded("429".into()).is_retryable());
        assert!(LlmError::ServiceUnavailable("503".into()).is_retryable());
        assert!(!LlmError::InvalidResponse("no choices".into()).is_retryable());
        assert!(!LlmError::AuthenticationError("bad key".into()).is_retryable());
    }

    #[test]
    fn test_permanent_classification() {
        assert!(LlmError::ApiKeyNotFound("OPENAI_API_KEY".into()).is_permanent());
        assert!(LlmError::InvalidRequest("bad body".into()).is_permanent());
        assert!(LlmError::ModelNotFound("gpt-9".into()).is_permanent());
        assert!(!LlmError::ProviderError("418".into()).is_permanent());
        assert!(!LlmError::Timeout("slow".into()).is_permanent());
    }

    #[test]
    fn test_serde_error_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let llm_err: LlmError = err.into();
        assert!(matches!(llm_err, LlmError::SerializationError(_)));
    }
}
