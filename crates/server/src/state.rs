//! Application state shared across handlers.

use crate::media::MediaServerClient;
use crate::proxy::ProxyClient;
use cinegate_core::config::AppConfig;
use cinegate_queue::TaskQueue;
use cinegate_resolver::{RedirectCache, ResolverEngine};
use cinegate_store::Store;
use std::sync::Arc;

/// Shared state, cheap to clone. Every dependency is injected from `main`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<ResolverEngine>,
    pub redirect_cache: Arc<RedirectCache>,
    pub queue: Arc<TaskQueue>,
    pub store: Arc<dyn Store>,
    pub media: Arc<MediaServerClient>,
    pub proxy: Arc<ProxyClient>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<AppConfig>,
        engine: Arc<ResolverEngine>,
        redirect_cache: Arc<RedirectCache>,
        queue: Arc<TaskQueue>,
        store: Arc<dyn Store>,
        media: Arc<MediaServerClient>,
        proxy: Arc<ProxyClient>,
    ) -> Self {
        Self {
            config,
            engine,
            redirect_cache,
            queue,
            store,
            media,
            proxy,
        }
    }
}
