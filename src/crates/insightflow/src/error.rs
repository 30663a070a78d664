//! Error types shared by the orchestration layer.

use llm::LlmError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while running an analysis workflow.
#[derive(Debug, Error)]
pub enum InsightError {
    /// The daily token budget cannot cover the requested work.
    #[error("Daily token budget exceeded: {requested} tokens requested, {remaining} remaining")]
    QuotaExceeded { requested: u64, remaining: u64 },

    /// A model call failed after retries.
    #[error("{agent} model call failed: {source}")]
    Upstream {
        agent: String,
        #[source]
        source: LlmError,
    },

    /// Tabular input was empty or malformed.
    #[error("Dataset analysis failed: {0}")]
    Analysis(String),

    /// Request did not have the expected shape.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The workflow did not finish in time.
    #[error("Workflow timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invariant violation inside the orchestrator.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, InsightError>;

/// Stable discriminator reported to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    QuotaExceeded,
    UpstreamError,
    AnalysisError,
    ValidationError,
    Timeout,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::QuotaExceeded => "quota_exceeded",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::AnalysisError => "analysis_error",
            ErrorKind::ValidationError => "validation_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InsightError {
    /// Build an upstream error for the named agent.
    pub fn upstream(agent: impl Into<String>, source: LlmError) -> Self {
        InsightError::Upstream {
            agent: agent.into(),
            source,
        }
    }

    /// Classify this error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InsightError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            InsightError::Upstream { .. } => ErrorKind::UpstreamError,
            InsightError::Analysis(_) => ErrorKind::AnalysisError,
            InsightError::Validation(_) => ErrorKind::ValidationError,
            InsightError::Timeout(_) => ErrorKind::Timeout,
            InsightError::Config(_) | InsightError::Internal(_) | InsightError::Serialization(_) => {
                ErrorKind::InternalError
            }
        }
    }
}
