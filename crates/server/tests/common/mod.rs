//! Server test utilities.

use cinegate_core::config::{AppConfig, DirectLinkConfig, ResolveConfig, ServerConfig};
use cinegate_core::rules::PathRule;
use cinegate_queue::{QueueConfig, TaskQueue};
use cinegate_resolver::{BackgroundPool, DirectLinkClient, RedirectCache, ResolverEngine};
use cinegate_server::{create_router, AppState, MediaEnricher, MediaServerClient, ProxyClient};
use cinegate_store::{SqliteStore, Store};
use std::sync::Arc;
use std::time::Duration;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub store: Arc<dyn Store>,
}

#[allow(dead_code)]
impl TestServer {
    /// Build a gateway around the given config. The task queue is wired
    /// but not started; tests that need execution start it themselves.
    pub async fn new(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let store: Arc<dyn Store> =
            Arc::new(SqliteStore::in_memory().await.expect("in-memory store"));

        let direct_link =
            DirectLinkClient::new(&config.direct_link).expect("direct-link client");
        let engine = Arc::new(ResolverEngine::new(
            &config,
            direct_link,
            None,
            None,
            Arc::clone(&store),
            Arc::new(BackgroundPool::new(2)),
        ));
        let redirect_cache = Arc::new(RedirectCache::new(Duration::from_secs(600)));

        let media =
            Arc::new(MediaServerClient::new(&config.media_server).expect("media client"));
        let enricher = Arc::new(MediaEnricher::new(Arc::clone(&media)));
        let queue = TaskQueue::new(
            Arc::clone(&store),
            enricher,
            QueueConfig {
                tick_interval: Duration::from_millis(10),
                min_spacing: Duration::from_millis(1),
                ..QueueConfig::default()
            },
        );
        let proxy = Arc::new(ProxyClient::new(&config.media_server.url).expect("proxy client"));

        let state = AppState::new(
            config,
            engine,
            redirect_cache,
            queue,
            Arc::clone(&store),
            media,
            proxy,
        );
        Self {
            router: create_router(state.clone()),
            state,
            store,
        }
    }
}

/// A config pointing every upstream at the given mock media server, with
/// one `/a → /b → /c` path rule and new-media processing enabled.
#[allow(dead_code)]
pub fn test_config(media_url: &str, direct_link_url: &str) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            process_new_media: true,
            ..ServerConfig::default()
        },
        media_server: cinegate_core::config::MediaServerConfig {
            url: media_url.to_string(),
            api_key: "test-key".to_string(),
            admin_user_id: String::new(),
        },
        resolve: ResolveConfig {
            paths: vec![PathRule {
                old_prefix: "/a".into(),
                new_prefix: "/b".into(),
                real_prefix: "/c".into(),
            }],
            ..ResolveConfig::default()
        },
        direct_link: DirectLinkConfig {
            url: direct_link_url.to_string(),
            token: String::new(),
            sign: false,
        },
        ..AppConfig::default()
    }
}
