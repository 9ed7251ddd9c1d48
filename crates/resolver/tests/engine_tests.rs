//! Resolution cascade tests with stubbed backends.

use cinegate_core::config::{
    AppConfig, DirectLinkConfig, DriveConfig, OpenApiConfig, ResolveConfig, ResolveMethod,
};
use cinegate_core::rules::PathRule;
use cinegate_resolver::{
    BackgroundPool, CookieDriveClient, DirectLinkClient, OpenApiClient, Resolution, ResolverEngine,
};
use cinegate_store::{SqliteStore, Store};
use cinegate_vault::{CredentialStore, LockOptions, RefreshGate};
use httpmock::prelude::*;
use reqwest::header::HeaderMap;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const UA: &str = "VLC/3.0";

fn rule() -> PathRule {
    PathRule {
        old_prefix: "/a".into(),
        new_prefix: "/b".into(),
        real_prefix: "/c".into(),
    }
}

fn app_config(
    method: ResolveMethod,
    dlink: &MockServer,
    drive: Option<&MockServer>,
    open: Option<&MockServer>,
) -> AppConfig {
    AppConfig {
        resolve: ResolveConfig {
            method,
            paths: vec![rule()],
            ..Default::default()
        },
        direct_link: DirectLinkConfig {
            url: dlink.base_url(),
            token: String::new(),
            sign: false,
        },
        drive: DriveConfig {
            url: drive.map(|s| s.base_url()).unwrap_or_default(),
            cookie: "UID=1; SEID=2".into(),
            ..Default::default()
        },
        open_api: OpenApiConfig {
            url: open.map(|s| s.base_url()).unwrap_or_default(),
            client_id: "client-1".into(),
        },
        ..Default::default()
    }
}

async fn new_store() -> Arc<dyn Store> {
    Arc::new(SqliteStore::in_memory().await.unwrap())
}

async fn credentials(dir: &tempfile::TempDir) -> CredentialStore {
    let store = CredentialStore::new(dir.path(), LockOptions::default(), Arc::new(RefreshGate::new()));
    store.write("refresh-1", "access-1").await.unwrap();
    store
}

fn build_engine(
    cfg: &AppConfig,
    store: Arc<dyn Store>,
    with_driver: bool,
    creds: Option<CredentialStore>,
) -> ResolverEngine {
    let dlink = DirectLinkClient::new(&cfg.direct_link).unwrap();
    let driver = with_driver.then(|| CookieDriveClient::new(&cfg.drive).unwrap());
    let open = creds.map(|c| OpenApiClient::new(&cfg.open_api, c).unwrap());
    ResolverEngine::new(cfg, dlink, driver, open, store, Arc::new(BackgroundPool::new(4)))
}

#[tokio::test]
async fn unmatched_path_passes_through() {
    let dlink = MockServer::start_async().await;
    let cfg = app_config(ResolveMethod::DirectLink, &dlink, None, None);
    let engine = build_engine(&cfg, new_store().await, false, None);

    let res = engine.resolve("/elsewhere/movie.mkv", UA, &HeaderMap::new()).await;
    assert_eq!(res, Resolution::PassThrough);
}

#[tokio::test]
async fn direct_link_method_rewrites_and_redirects() {
    let dlink = MockServer::start_async().await;
    let mock = dlink
        .mock_async(|when, then| {
            when.method(GET).path("/d/b/movie.mkv");
            then.status(302).header("Location", "https://cdn/x");
        })
        .await;

    let cfg = app_config(ResolveMethod::DirectLink, &dlink, None, None);
    let engine = build_engine(&cfg, new_store().await, false, None);

    let res = engine.resolve("/a/movie.mkv", UA, &HeaderMap::new()).await;
    assert_eq!(res, Resolution::Redirect("https://cdn/x".into()));
    mock.assert_async().await;
}

#[tokio::test]
async fn cookie_method_serves_from_pickcode_cache() {
    let dlink = MockServer::start_async().await;
    let drive = MockServer::start_async().await;
    drive
        .mock_async(|when, then| {
            when.method(GET)
                .path("/files/download")
                .query_param("pickcode", "pc123")
                .header("user-agent", UA);
            then.status(200)
                .json_body(json!({"state": true, "file_url": "https://cdn/ck"}));
        })
        .await;

    let store = new_store().await;
    store.save_pickcode("/c/movie.mkv", "pc123").await.unwrap();

    let cfg = app_config(ResolveMethod::Cookie, &dlink, Some(&drive), None);
    let engine = build_engine(&cfg, Arc::clone(&store), true, None);

    let res = engine.resolve("/a/movie.mkv", UA, &HeaderMap::new()).await;
    assert_eq!(res, Resolution::Redirect("https://cdn/ck".into()));
}

#[tokio::test]
async fn cookie_method_lists_directory_and_caches_siblings() {
    let dlink = MockServer::start_async().await;
    let drive = MockServer::start_async().await;
    drive
        .mock_async(|when, then| {
            when.method(GET)
                .path("/files/getid")
                .query_param("path", "/c/show");
            then.status(200).json_body(json!({"state": true, "id": "cid1"}));
        })
        .await;
    drive
        .mock_async(|when, then| {
            when.method(GET).path("/files").query_param("cid", "cid1");
            then.status(200).json_body(json!({
                "state": true,
                "data": [
                    {"n": "ep1.mkv", "pc": "pc1"},
                    {"n": "ep2.mkv", "pc": "pc2"}
                ]
            }));
        })
        .await;
    drive
        .mock_async(|when, then| {
            when.method(GET)
                .path("/files/download")
                .query_param("pickcode", "pc1");
            then.status(200)
                .json_body(json!({"state": true, "file_url": "https://cdn/ep1"}));
        })
        .await;

    let store = new_store().await;
    let mut cfg = app_config(ResolveMethod::Cookie, &dlink, Some(&drive), None);
    cfg.resolve.paths = vec![PathRule {
        old_prefix: "/a".into(),
        new_prefix: "/b".into(),
        real_prefix: "/c/show".into(),
    }];
    let engine = build_engine(&cfg, Arc::clone(&store), true, None);

    let res = engine.resolve("/a/ep1.mkv", UA, &HeaderMap::new()).await;
    assert_eq!(res, Resolution::Redirect("https://cdn/ep1".into()));

    // The matched file is cached synchronously.
    assert_eq!(
        store.get_pickcode("/c/show/ep1.mkv").await.unwrap().as_deref(),
        Some("pc1")
    );
    // Siblings arrive from the background pool.
    for _ in 0..100 {
        if store.get_pickcode("/c/show/ep2.mkv").await.unwrap().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        store.get_pickcode("/c/show/ep2.mkv").await.unwrap().as_deref(),
        Some("pc2")
    );
}

#[tokio::test]
async fn cookie_driver_failure_falls_back_to_open_api() {
    let dlink = MockServer::start_async().await;
    let drive = MockServer::start_async().await;
    let open = MockServer::start_async().await;
    drive
        .mock_async(|when, then| {
            when.method(GET).path("/files/download");
            then.status(200)
                .json_body(json!({"state": false, "error": "cookie expired"}));
        })
        .await;
    open
        .mock_async(|when, then| {
            when.method(POST)
                .path("/open/ufile/downurl")
                .header("authorization", "Bearer access-1")
                .body_contains("pick_code=pc123");
            then.status(200).json_body(json!({
                "state": true,
                "data": {"9001": {"url": {"url": "https://cdn/open"}}}
            }));
        })
        .await;

    let store = new_store().await;
    store.save_pickcode("/c/movie.mkv", "pc123").await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let creds = credentials(&dir).await;
    let cfg = app_config(ResolveMethod::Cookie, &dlink, Some(&drive), Some(&open));
    let engine = build_engine(&cfg, store, true, Some(creds));

    let res = engine.resolve("/a/movie.mkv", UA, &HeaderMap::new()).await;
    assert_eq!(res, Resolution::Redirect("https://cdn/open".into()));
}

#[tokio::test]
async fn missing_file_degrades_to_direct_link() {
    let dlink = MockServer::start_async().await;
    let drive = MockServer::start_async().await;
    drive
        .mock_async(|when, then| {
            when.method(GET).path("/files/getid");
            then.status(200).json_body(json!({"state": true, "id": "cid1"}));
        })
        .await;
    drive
        .mock_async(|when, then| {
            when.method(GET).path("/files");
            then.status(200).json_body(json!({"state": true, "data": []}));
        })
        .await;
    let fallback = dlink
        .mock_async(|when, then| {
            when.method(GET).path("/d/b/movie.mkv");
            then.status(302).header("Location", "https://cdn/direct");
        })
        .await;

    let cfg = app_config(ResolveMethod::Cookie, &dlink, Some(&drive), None);
    let engine = build_engine(&cfg, new_store().await, true, None);

    let res = engine.resolve("/a/movie.mkv", UA, &HeaderMap::new()).await;
    assert_eq!(res, Resolution::Redirect("https://cdn/direct".into()));
    fallback.assert_async().await;
}

#[tokio::test]
async fn open_api_method_resolves_by_path() {
    let dlink = MockServer::start_async().await;
    let open = MockServer::start_async().await;
    open.mock_async(|when, then| {
        when.method(POST)
            .path("/open/folder/get_info")
            .body_contains("path=%2Fc%2Fmovie.mkv");
        then.status(200)
            .json_body(json!({"state": true, "data": {"pick_code": "pc9"}}));
    })
    .await;
    open.mock_async(|when, then| {
        when.method(POST)
            .path("/open/ufile/downurl")
            .body_contains("pick_code=pc9");
        then.status(200).json_body(json!({
            "state": true,
            "data": {"42": {"url": {"url": "https://cdn/open9"}}}
        }));
    })
    .await;

    let dir = tempfile::tempdir().unwrap();
    let creds = credentials(&dir).await;
    let cfg = app_config(ResolveMethod::OpenApi, &dlink, None, Some(&open));
    let engine = build_engine(&cfg, new_store().await, false, Some(creds));

    let res = engine.resolve("/a/movie.mkv", UA, &HeaderMap::new()).await;
    assert_eq!(res, Resolution::Redirect("https://cdn/open9".into()));
}
