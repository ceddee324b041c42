//! API Routes
//!
//! Configures the Axum router for the proxy.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{health_handler, proxy_handler, stats_handler, AppState};

/// Creates the main router.
///
/// # Endpoints
/// - `GET /_health` - Health check
/// - `GET /_stats` - Cache statistics
/// - `GET`/`HEAD` on any other path - Key lookup, key = path without the
///   leading `/`; other methods answer 405
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/_health", get(health_handler))
        .route("/_stats", get(stats_handler))
        .fallback(get(proxy_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
