//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Create the application router.
///
/// Everything that is not an explicit gateway surface falls through to the
/// play-or-proxy handler, which mirrors the media server's entire API.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/webhook", post(handlers::webhook))
        .route("/admin/queue", get(handlers::queue_status))
        .route("/admin/queue/cleanup", post(handlers::queue_cleanup))
        .route("/admin/cache", get(handlers::cache_status))
        .route("/admin/cache/clear", post(handlers::cache_clear))
        .fallback(handlers::gateway)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
