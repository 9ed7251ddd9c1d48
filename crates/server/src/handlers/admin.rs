//! Health and queue introspection endpoints.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check (intentionally unauthenticated for probes).
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct QueueStatusResponse {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub executing: bool,
}

pub async fn queue_status(State(state): State<AppState>) -> ApiResult<Json<QueueStatusResponse>> {
    let status = state.queue.status().await?;
    Ok(Json(QueueStatusResponse {
        pending: status.counts.pending,
        processing: status.counts.processing,
        completed: status.counts.completed,
        failed: status.counts.failed,
        executing: status.executing,
    }))
}

#[derive(Serialize)]
pub struct CleanupResponse {
    pub completed_removed: u64,
    pub failed_removed: u64,
}

/// Manual sweep of finished task rows past their retention windows.
pub async fn queue_cleanup(State(state): State<AppState>) -> ApiResult<Json<CleanupResponse>> {
    let outcome = state.queue.cleanup_now().await?;
    Ok(Json(CleanupResponse {
        completed_removed: outcome.completed_removed,
        failed_removed: outcome.failed_removed,
    }))
}

#[derive(Serialize)]
pub struct CacheStatusResponse {
    /// Rows in the durable pickcode table.
    pub pickcodes: u64,
    /// Live entries in the in-memory redirect cache.
    pub redirects: usize,
}

pub async fn cache_status(State(state): State<AppState>) -> ApiResult<Json<CacheStatusResponse>> {
    state.redirect_cache.purge();
    Ok(Json(CacheStatusResponse {
        pickcodes: state.store.count_pickcodes().await?,
        redirects: state.redirect_cache.len(),
    }))
}

#[derive(Serialize)]
pub struct CacheClearResponse {
    pub pickcodes_removed: u64,
}

/// Drop every cached pickcode; subsequent resolutions re-list the drive.
pub async fn cache_clear(State(state): State<AppState>) -> ApiResult<Json<CacheClearResponse>> {
    let removed = state.store.clear_pickcodes().await?;
    tracing::info!(removed, "pickcode cache cleared by operator");
    Ok(Json(CacheClearResponse {
        pickcodes_removed: removed,
    }))
}
