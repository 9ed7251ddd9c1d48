//! Playback interception: answer stream requests with a 302 when a
//! backend can serve the bytes directly, proxy otherwise.

use crate::handlers::sessions;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use cinegate_core::request_fingerprint;
use cinegate_resolver::Resolution;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static PLAY_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/[Vv]ideos/([^/\s]+)/(stream|original|master)").expect("play regex is valid")
});

/// Extract the item id from a playback URI, if it is one.
pub fn play_item_id(path: &str) -> Option<&str> {
    PLAY_URI
        .captures(path)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Fallback handler for everything the explicit routes don't cover: the
/// playback-session intercept, play interception, or plain proxying.
pub async fn gateway(State(state): State<AppState>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let stripped = path.strip_prefix("/emby").unwrap_or(&path);

    if req.method() == Method::POST
        && stripped == "/Sessions/Playing"
        && state.config.server.process_new_media
    {
        return sessions::playing(state, req).await;
    }

    if let Some(item_id) = play_item_id(&path).map(str::to_owned) {
        return play(state, req, &item_id).await;
    }

    proxy_fallback(&state, req).await
}

async fn play(state: AppState, req: Request, item_id: &str) -> Response {
    let uri = req.uri().to_string();
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let fingerprint = request_fingerprint(&uri, &user_agent);

    if let Some(url) = state.redirect_cache.get(&fingerprint) {
        debug!(item_id, "redirect cache hit");
        return redirect(url);
    }

    let item = match state.media.item(item_id).await {
        Ok(item) => item,
        Err(err) => {
            warn!(item_id, error = %err, "item lookup failed, proxying");
            return proxy_fallback(&state, req).await;
        }
    };
    if item.path.is_empty() {
        debug!(item_id, "item has no storage path, proxying");
        return proxy_fallback(&state, req).await;
    }

    let mut headers = req.headers().clone();
    headers.remove(header::HOST);

    match state.engine.resolve(&item.path, &user_agent, &headers).await {
        Resolution::Redirect(url) => {
            state.redirect_cache.insert(fingerprint, url.clone());
            info!(item_id, "redirecting playback");
            redirect(url)
        }
        Resolution::PassThrough => proxy_fallback(&state, req).await,
    }
}

async fn proxy_fallback(state: &AppState, req: Request) -> Response {
    match state.proxy.forward(req).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

fn redirect(url: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url)]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_stream_original_and_master() {
        assert_eq!(play_item_id("/Videos/42/stream"), Some("42"));
        assert_eq!(play_item_id("/videos/42/original.mkv"), Some("42"));
        assert_eq!(play_item_id("/emby/Videos/abc/master.m3u8"), Some("abc"));
    }

    #[test]
    fn ignores_other_uris() {
        assert_eq!(play_item_id("/Items/42"), None);
        assert_eq!(play_item_id("/Videos/42/Subtitles"), None);
        assert_eq!(play_item_id("/Sessions/Playing"), None);
    }
}
