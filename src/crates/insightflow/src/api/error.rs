//! API error types and HTTP response conversion
//!
//! Every failure reaching a handler is reported as a JSON body with a kind
//! discriminator and a one-line message. Internal failures keep their details
//! in the logs only.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::supervisor::{WorkflowFailure, WorkflowStage, WorkflowStatus};

/// Message returned in place of internal error details.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// API error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Always [`WorkflowStatus::Error`]
    pub status: WorkflowStatus,
    /// Error kind identifier
    pub error: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
    /// Workflow stage that failed, if the pipeline had started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<WorkflowStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Custom API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body did not have the expected shape
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// A workflow run that stopped early
    #[error(transparent)]
    Workflow(#[from] WorkflowFailure),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::ValidationError(_) => ErrorKind::ValidationError,
            ApiError::Workflow(f) => f.error.kind(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::AnalysisError => StatusCode::BAD_REQUEST,
            ErrorKind::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code identifier
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::AnalysisError => "ANALYSIS_ERROR",
            ErrorKind::UpstreamError => "UPSTREAM_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }

    /// One-line message safe to show callers
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::InternalError => INTERNAL_ERROR_MESSAGE.to_string(),
            _ => self.to_string().lines().next().unwrap_or_default().to_string(),
        }
    }

    pub fn to_response(&self) -> ApiErrorResponse {
        let (stage, run_id) = match self {
            ApiError::Workflow(f) => (f.failed_at, Some(f.run_id)),
            _ => (None, None),
        };

        ApiErrorResponse {
            status: WorkflowStatus::Error,
            error: self.kind(),
            message: self.public_message(),
            code: self.code().to_string(),
            stage,
            run_id,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_response();

        if status.is_server_error() {
            tracing::error!(code = %body.code, error = %self, "API Error");
        } else {
            tracing::warn!(code = %body.code, error = %self, "API Error");
        }

        (status, Json(body)).into_response()
    }
}
