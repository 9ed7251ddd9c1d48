//! Read/refresh coordination.
//!
//! The refresher raises the gate for the duration of a refresh; store
//! readers wait for it to drop before reading so they never observe a
//! half-written pair. Implemented as a `watch` channel so completion is
//! broadcast instead of polled, but waiters still carry their own ceiling:
//! a hung refresh call must never block readers indefinitely.

use std::time::Duration;
use tokio::sync::watch;

/// Ceiling on how long a reader waits for an in-flight refresh. Independent
/// of the refresh call's own timeout.
pub const WAIT_CEILING: Duration = Duration::from_secs(60);

/// Shared refresh-in-progress signal.
#[derive(Debug)]
pub struct RefreshGate {
    tx: watch::Sender<bool>,
}

impl Default for RefreshGate {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        *self.tx.borrow()
    }

    /// Raise the gate for the duration of the returned guard.
    pub fn enter(&self) -> RefreshInProgress {
        self.tx.send_replace(true);
        RefreshInProgress {
            tx: self.tx.clone(),
        }
    }

    /// Wait until no refresh is in flight, up to [`WAIT_CEILING`].
    ///
    /// Returns whether the gate actually dropped; on a ceiling hit the
    /// caller proceeds anyway and serves whatever the file holds.
    pub async fn wait_idle(&self) -> bool {
        let mut rx = self.tx.subscribe();
        if !*rx.borrow() {
            return true;
        }
        tracing::debug!("token refresh in flight, waiting for completion");
        let waited = tokio::time::timeout(WAIT_CEILING, rx.wait_for(|refreshing| !*refreshing)).await;
        match waited {
            Ok(Ok(_)) => true,
            // Sender dropped: the refresher is gone, nothing to wait for.
            Ok(Err(_)) => true,
            Err(_) => {
                tracing::warn!(
                    ceiling_secs = WAIT_CEILING.as_secs(),
                    "gave up waiting for token refresh to complete"
                );
                false
            }
        }
    }
}

/// RAII guard; dropping it broadcasts refresh completion.
#[derive(Debug)]
pub struct RefreshInProgress {
    tx: watch::Sender<bool>,
}

impl Drop for RefreshInProgress {
    fn drop(&mut self) {
        self.tx.send_replace(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn idle_gate_does_not_wait() {
        let gate = RefreshGate::new();
        assert!(!gate.is_refreshing());
        assert!(gate.wait_idle().await);
    }

    #[tokio::test]
    async fn waiters_resume_when_guard_drops() {
        let gate = Arc::new(RefreshGate::new());
        let guard = gate.enter();
        assert!(gate.is_refreshing());

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_idle().await })
        };
        // The waiter must still be parked while the guard is held.
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        assert!(waiter.await.unwrap());
        assert!(!gate.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_gives_up_at_the_ceiling() {
        let gate = RefreshGate::new();
        let _guard = gate.enter();
        assert!(!gate.wait_idle().await);
    }
}
