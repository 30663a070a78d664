//! REST API layer
//!
//! - `GET /health`
//! - `POST /api/analysis/analyze`: run the analysis workflow
//! - `GET /api/analysis/token-usage`: current token budget window

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use middleware::cors_layer;
pub use routes::{create_router, AppState};
