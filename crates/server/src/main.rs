//! Cinegate server binary.

use anyhow::{Context, Result};
use cinegate_core::config::AppConfig;
use cinegate_queue::{QueueConfig, TaskQueue};
use cinegate_resolver::{
    BackgroundPool, CookieDriveClient, DirectLinkClient, OpenApiClient, OpenApiRefresh,
    RedirectCache, ResolverEngine,
};
use cinegate_server::{create_router, AppState, MediaEnricher, MediaServerClient, ProxyClient};
use cinegate_vault::{CredentialStore, RefreshGate, RefresherConfig, TokenRefresher};
use clap::Parser;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Cinegate - media-server gateway
#[derive(Parser, Debug)]
#[command(name = "cinegated")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "CINEGATE_CONFIG",
        default_value = "config/cinegate.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Cinegate v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional, env vars can provide/override
    // everything).
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("no config file found at {}", args.config);
    }
    let config: AppConfig = figment
        .merge(Env::prefixed("CINEGATE_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    let config = Arc::new(config);

    std::fs::create_dir_all(&config.vault.data_dir)
        .with_context(|| format!("failed to create data dir {}", config.vault.data_dir))?;

    let store = cinegate_store::from_config(&config.store)
        .await
        .context("failed to open store")?;
    tracing::info!(db_path = %config.store.db_path, "store opened");

    // Credential vault and proactive refresher.
    let gate = Arc::new(RefreshGate::new());
    let credentials = CredentialStore::from_config(&config.vault, Arc::clone(&gate));
    let refresher = if config.open_api.url.is_empty() {
        tracing::warn!("open_api.url not set, token refresher disabled");
        None
    } else {
        let api =
            OpenApiRefresh::new(&config.open_api).context("failed to build refresh client")?;
        let refresher = Arc::new(TokenRefresher::new(
            credentials.clone(),
            Arc::clone(&gate),
            Arc::new(api),
            RefresherConfig {
                check_interval: config.vault.check_interval(),
                max_age: config.vault.token_max_age(),
                ..RefresherConfig::default()
            },
        ));
        refresher.start().await;
        Some(refresher)
    };

    // Resolution engine and its backends.
    let pool = Arc::new(BackgroundPool::new(4));
    let direct_link =
        DirectLinkClient::new(&config.direct_link).context("failed to build direct-link client")?;
    let driver = if config.resolve.method.uses_cookie_driver() && !config.drive.url.is_empty() {
        Some(CookieDriveClient::new(&config.drive).context("failed to build drive client")?)
    } else {
        None
    };
    let open_api = if config.open_api.url.is_empty() {
        None
    } else {
        Some(
            OpenApiClient::new(&config.open_api, credentials.clone())
                .context("failed to build open-api client")?,
        )
    };
    let engine = Arc::new(ResolverEngine::new(
        &config,
        direct_link,
        driver,
        open_api,
        Arc::clone(&store),
        Arc::clone(&pool),
    ));
    let redirect_cache = Arc::new(RedirectCache::new(Duration::from_secs(
        config.resolve.redirect_cache_minutes * 60,
    )));

    // Media-server client, enrichment queue, proxy.
    let media =
        Arc::new(MediaServerClient::new(&config.media_server).context("failed to build media client")?);
    let enricher = Arc::new(MediaEnricher::new(Arc::clone(&media)));
    let queue = TaskQueue::new(Arc::clone(&store), enricher, QueueConfig::default());
    queue.start().await.context("failed to start task queue")?;
    let proxy =
        Arc::new(ProxyClient::new(&config.media_server.url).context("failed to build proxy")?);

    let state = AppState::new(
        Arc::clone(&config),
        engine,
        redirect_cache,
        Arc::clone(&queue),
        Arc::clone(&store),
        media,
        proxy,
    );
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Ordered teardown: the accept loop has already drained here, then the
    // queue, the refresher and finally the background pool.
    if let Err(err) = queue.stop().await {
        tracing::warn!(error = %err, "task queue did not stop cleanly");
    }
    if let Some(refresher) = refresher {
        refresher.stop().await;
    }
    pool.shutdown(Duration::from_secs(5)).await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
