//! Webhook ingress from the media server.

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct WebhookItem {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    #[serde(rename = "Event", default)]
    pub event: String,
    #[serde(rename = "Item", default)]
    pub item: WebhookItem,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub message: &'static str,
    pub event: String,
}

/// Every event is acknowledged with 200; only `library.new` does work.
pub async fn webhook(
    State(state): State<AppState>,
    Json(body): Json<WebhookRequest>,
) -> Json<WebhookResponse> {
    match body.event.as_str() {
        "library.new" => handle_library_new(&state, &body).await,
        other => debug!(event = other, "ignoring webhook event"),
    }
    Json(WebhookResponse {
        message: "ok",
        event: body.event,
    })
}

async fn handle_library_new(state: &AppState, body: &WebhookRequest) {
    if !state.config.server.process_new_media {
        debug!(item = %body.item.name, "new-media processing disabled, skipping");
        return;
    }
    if body.item.id.is_empty() {
        warn!("library.new event without an item id");
        return;
    }
    match state.queue.add_task(&body.item.id).await {
        Ok(true) => info!(item_id = %body.item.id, item = %body.item.name, "enrichment task enqueued"),
        Ok(false) => debug!(item_id = %body.item.id, "enrichment task already queued"),
        Err(err) => warn!(item_id = %body.item.id, error = %err, "failed to enqueue enrichment task"),
    }
}
