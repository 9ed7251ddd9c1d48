//! Bounded pool for best-effort background work.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Runs fire-and-forget futures with a concurrency bound. Work submitted
/// here is best effort: it is abandoned on shutdown after a grace period.
pub struct BackgroundPool {
    tracker: TaskTracker,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl BackgroundPool {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            tracker: TaskTracker::new(),
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            cancel: CancellationToken::new(),
        }
    }

    /// Queue a future. It waits for a permit before running and is dropped
    /// if shutdown begins before a permit is acquired; once running it is
    /// allowed to finish within the shutdown grace.
    pub fn spawn<F>(&self, fut: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return;
        }
        let semaphore = Arc::clone(&self.semaphore);
        let cancel = self.cancel.clone();
        self.tracker.spawn(async move {
            let permit = tokio::select! {
                _ = cancel.cancelled() => return,
                permit = semaphore.acquire_owned() => permit,
            };
            let Ok(_permit) = permit else { return };
            fut.await;
        });
    }

    /// Stop accepting work and wait up to `grace` for in-flight futures.
    pub async fn shutdown(&self, grace: Duration) {
        self.cancel.cancel();
        self.tracker.close();
        if timeout(grace, self.tracker.wait()).await.is_err() {
            debug!("background pool shutdown grace elapsed");
        }
    }
}
