//! Health check endpoint handler

use axum::{extract::State, Json};

use crate::api::{models::HealthResponse, routes::AppState};

/// Handler for GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(&*state.server_name))
}
