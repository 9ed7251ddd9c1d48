//! Proactive token refresh loop.
//!
//! The refresher checks token age on a fixed interval (and once
//! immediately at startup) and renews the pair ahead of the provider's
//! real expiry. A failed refresh leaves the previous pair untouched and is
//! not retried before the next scheduled tick.

use crate::error::VaultResult;
use crate::gate::RefreshGate;
use crate::store::CredentialStore;
use crate::VaultError;
use async_trait::async_trait;
use cinegate_core::TokenPair;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The external refresh-token exchange, injected so this crate carries no
/// HTTP client of its own. Implemented by the resolver's open-API client.
#[async_trait]
pub trait TokenRefreshApi: Send + Sync {
    async fn refresh(&self, current: &TokenPair) -> VaultResult<TokenPair>;
}

#[derive(Clone, Copy, Debug)]
pub struct RefresherConfig {
    /// Interval between validity checks.
    pub check_interval: Duration,
    /// Age beyond which the pair is refreshed.
    pub max_age: Duration,
    /// Timeout on the refresh call itself.
    pub call_timeout: Duration,
    /// Grace period `stop` waits for the loop to exit.
    pub stop_grace: Duration,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(600),
            max_age: Duration::from_secs(4800),
            call_timeout: Duration::from_secs(30),
            stop_grace: Duration::from_secs(5),
        }
    }
}

/// Background credential refresher.
pub struct TokenRefresher {
    store: CredentialStore,
    gate: Arc<RefreshGate>,
    api: Arc<dyn TokenRefreshApi>,
    config: RefresherConfig,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TokenRefresher {
    pub fn new(
        store: CredentialStore,
        gate: Arc<RefreshGate>,
        api: Arc<dyn TokenRefreshApi>,
        config: RefresherConfig,
    ) -> Self {
        Self {
            store,
            gate,
            api,
            config,
            cancel: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    /// Launch the check loop. The first check runs immediately.
    pub async fn start(self: &Arc<Self>) {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return;
        }
        let this = self.clone();
        *handle = Some(tokio::spawn(async move { this.run().await }));
        tracing::info!(
            check_interval_secs = self.config.check_interval.as_secs(),
            max_age_secs = self.config.max_age.as_secs(),
            "token refresher started"
        );
    }

    /// Cancel the loop and wait for it to exit, bounded by the grace period.
    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().await.take() {
            match tokio::time::timeout(self.config.stop_grace, handle).await {
                Ok(_) => tracing::info!("token refresher stopped"),
                Err(_) => tracing::warn!("token refresher did not stop within grace period"),
            }
        }
    }

    async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                // First tick fires immediately, giving the startup check.
                _ = ticker.tick() => self.check_once().await,
            }
        }
    }

    async fn check_once(&self) {
        let pair = match self.store.read_for_refresh() {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(error = %e, "failed to read tokens for validity check");
                return;
            }
        };
        if pair.is_valid(self.config.max_age) {
            if let Some(age) = pair.age() {
                tracing::debug!(age_secs = age.whole_seconds(), "token still valid");
            }
            return;
        }
        tracing::info!("token missing or near expiry, refreshing");
        if let Err(e) = self.refresh_now(pair).await {
            // Previous pair stays in place; next tick retries.
            tracing::error!(error = %e, "token refresh failed");
        }
    }

    async fn refresh_now(&self, current: TokenPair) -> VaultResult<()> {
        if current.refresh_token.is_empty() {
            return Err(VaultError::EmptyRefreshToken);
        }

        let _in_progress = self.gate.enter();

        let renewed = tokio::select! {
            _ = self.cancel.cancelled() => {
                return Err(VaultError::Refresh("cancelled by shutdown".into()));
            }
            result = tokio::time::timeout(self.config.call_timeout, self.api.refresh(&current)) => {
                match result {
                    Ok(Ok(pair)) => pair,
                    Ok(Err(e)) => return Err(e),
                    Err(_) => {
                        return Err(VaultError::Refresh(format!(
                            "refresh call timed out after {:?}",
                            self.config.call_timeout
                        )));
                    }
                }
            }
        };

        // Do not persist a partial result when shutdown raced the call.
        if self.cancel.is_cancelled() {
            return Err(VaultError::Refresh("cancelled before persisting".into()));
        }

        self.store
            .update(&renewed.refresh_token, &renewed.access_token)
            .await?;
        tracing::info!("token refreshed");
        Ok(())
    }
}
