//! CORS middleware configuration

use tower_http::cors::CorsLayer;

/// Permissive CORS so browser dashboards on other origins can call the API
pub fn cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
