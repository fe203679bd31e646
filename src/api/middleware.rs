//! API Middleware

use axum::extract::DefaultBodyLimit;
use tower_http::cors::CorsLayer;

/// CORS for the browser frontend
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}

/// Reject request bodies above `max_bytes`
pub fn create_body_limit_layer(max_bytes: usize) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_bytes)
}
