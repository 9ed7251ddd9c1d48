//! Gateway surface tests: health, webhook ingress, admin introspection,
//! play interception and pass-through proxying.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{test_config, TestServer};
use httpmock::prelude::*;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let server = TestServer::new(test_config("http://127.0.0.1:1", "")).await;
    let response = server
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn webhook_library_new_enqueues_a_task() {
    let server = TestServer::new(test_config("http://127.0.0.1:1", "")).await;
    let request = json_request(
        "POST",
        "/webhook",
        json!({"Event": "library.new", "Item": {"Id": "item-7", "Name": "Movie"}}),
    );
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status = server
        .router
        .clone()
        .oneshot(Request::get("/admin/queue").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(status).await;
    assert_eq!(body["pending"], 1);
}

#[tokio::test]
async fn webhook_ignores_other_events() {
    let server = TestServer::new(test_config("http://127.0.0.1:1", "")).await;
    let request = json_request(
        "POST",
        "/webhook",
        json!({"Event": "playback.start", "Item": {"Id": "item-7"}}),
    );
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let counts = server.state.queue.status().await.unwrap().counts;
    assert_eq!(counts.pending, 0);
}

#[tokio::test]
async fn webhook_respects_disabled_processing() {
    let mut config = test_config("http://127.0.0.1:1", "");
    config.server.process_new_media = false;
    let server = TestServer::new(config).await;

    let request = json_request(
        "POST",
        "/webhook",
        json!({"Event": "library.new", "Item": {"Id": "item-7"}}),
    );
    let response = server.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.state.queue.status().await.unwrap().counts.pending, 0);
}

#[tokio::test]
async fn admin_cleanup_reports_removed_counts() {
    let server = TestServer::new(test_config("http://127.0.0.1:1", "")).await;
    let response = server
        .router
        .clone()
        .oneshot(
            Request::post("/admin/queue/cleanup")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["completed_removed"], 0);
    assert_eq!(body["failed_removed"], 0);
}

#[tokio::test]
async fn admin_cache_status_and_clear() {
    let server = TestServer::new(test_config("http://127.0.0.1:1", "")).await;
    server
        .store
        .save_pickcode("/c/movie.mkv", "pc1")
        .await
        .unwrap();
    server
        .store
        .save_pickcode("/c/other.mkv", "pc2")
        .await
        .unwrap();

    let response = server
        .router
        .clone()
        .oneshot(Request::get("/admin/cache").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["pickcodes"], 2);
    assert_eq!(body["redirects"], 0);

    let response = server
        .router
        .clone()
        .oneshot(
            Request::post("/admin/cache/clear")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["pickcodes_removed"], 2);
    assert_eq!(server.store.count_pickcodes().await.unwrap(), 0);
}

#[tokio::test]
async fn play_request_redirects_and_fills_the_cache() {
    let media = MockServer::start_async().await;
    media
        .mock_async(|when, then| {
            when.method(GET).path("/emby/Items/42");
            then.status(200)
                .json_body(json!({"Id": "42", "Path": "/a/movie.mkv"}));
        })
        .await;
    let dlink = MockServer::start_async().await;
    let redirect = dlink
        .mock_async(|when, then| {
            when.method(GET).path("/d/b/movie.mkv");
            then.status(302).header("Location", "https://cdn/m");
        })
        .await;

    let server = TestServer::new(test_config(&media.base_url(), &dlink.base_url())).await;
    let request = || {
        Request::get("/Videos/42/stream?api_key=k")
            .header(header::USER_AGENT, "VLC/3.0")
            .body(Body::empty())
            .unwrap()
    };

    let response = server.router.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://cdn/m"
    );

    // Second request is served from the redirect cache.
    let response = server.router.clone().oneshot(request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(redirect.hits_async().await, 1);
}

#[tokio::test]
async fn unmatched_requests_are_proxied() {
    let media = MockServer::start_async().await;
    let upstream = media
        .mock_async(|when, then| {
            when.method(GET).path("/System/Info");
            then.status(200).json_body(json!({"Version": "4.8"}));
        })
        .await;

    let server = TestServer::new(test_config(&media.base_url(), "")).await;
    let response = server
        .router
        .clone()
        .oneshot(Request::get("/System/Info").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["Version"], "4.8");
    upstream.assert_async().await;
}
