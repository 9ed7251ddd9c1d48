//! Playback-session intercept.
//!
//! A `/Sessions/Playing` POST means a player just started an item: enqueue
//! enrichment for it (and, when configured, for the next episode) without
//! ever delaying the proxied response.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, warn};

const MAX_SESSION_BODY: usize = 1024 * 1024;

#[derive(Deserialize)]
struct StartInfo {
    #[serde(rename = "ItemId", default)]
    item_id: String,
}

pub async fn playing(state: AppState, req: Request) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_SESSION_BODY).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return ApiError::BadRequest(format!("failed to read session body: {err}"))
                .into_response()
        }
    };

    if let Ok(info) = serde_json::from_slice::<StartInfo>(&bytes) {
        if !info.item_id.is_empty() {
            let state = state.clone();
            tokio::spawn(async move { enqueue(state, info.item_id).await });
        }
    }

    match state.proxy.forward_parts(parts, bytes).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn enqueue(state: AppState, item_id: String) {
    if let Err(err) = state.queue.add_task(&item_id).await {
        warn!(item_id, error = %err, "failed to enqueue playing item");
    }

    if !state.config.server.prefetch_next_episode {
        return;
    }
    match state.media.next_episode(&item_id).await {
        Ok(Some(next)) => {
            debug!(item_id, next, "prefetching next episode");
            if let Err(err) = state.queue.add_task(&next).await {
                warn!(item_id = next, error = %err, "failed to enqueue next episode");
            }
        }
        Ok(None) => {}
        Err(err) => warn!(item_id, error = %err, "next-episode lookup failed"),
    }
}
