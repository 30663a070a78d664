//! Analysis endpoint handlers

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::middleware::{validate_not_empty, validate_string_length};
use crate::api::models::{AnalyzeRequest, AnalyzeResponse, TokenUsageResponse, MAX_QUERY_LENGTH};
use crate::api::routes::AppState;

/// Handler for POST /api/analysis/analyze
///
/// Runs the full workflow. Malformed bodies are reported as validation
/// errors rather than axum's plain-text rejections.
pub async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<AnalyzeResponse>> {
    let Json(request) = payload.map_err(|rejection| ApiError::ValidationError(rejection.body_text()))?;

    validate_not_empty(&request.query, "query")?;
    validate_string_length(&request.query, "query", 1, MAX_QUERY_LENGTH)?;

    info!(rows = request.dataset.data.len(), "Analysis requested");

    let dataset = request.dataset.into_value();
    let result = state.supervisor.run(&request.query, &dataset).await?;

    Ok(Json(result.into()))
}

/// Handler for GET /api/analysis/token-usage
pub async fn token_usage(State(state): State<AppState>) -> Json<TokenUsageResponse> {
    Json(state.supervisor.tracker().stats().into())
}
