//! API route definitions
//!
//! Defines all API routes and their associated handler functions.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::api::middleware::{cors_layer, logging_layer};
use crate::supervisor::Supervisor;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub server_name: Arc<str>,
}

impl AppState {
    pub fn new(supervisor: Arc<Supervisor>, server_name: impl Into<Arc<str>>) -> Self {
        Self {
            supervisor,
            server_name: server_name.into(),
        }
    }
}

/// Build the complete API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/analysis/analyze", post(handlers::analyze))
        .route("/api/analysis/token-usage", get(handlers::token_usage))
        .layer(logging_layer())
        .layer(cors_layer())
        .with_state(state)
}
