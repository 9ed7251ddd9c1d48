//! Queue worker and cleanup loops.

use crate::enrich::Enrich;
use crate::error::{QueueError, QueueResult};
use cinegate_core::{COMPLETED_TASK_RETENTION_DAYS, FAILED_TASK_RETENTION_DAYS, TASK_RETRY_LIMIT};
use cinegate_store::{MediaTaskRow, Store, SweepOutcome, TaskCounts};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Timing knobs for the queue loops.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// How often the worker polls for a pending task.
    pub tick_interval: Duration,
    /// Minimum gap between two task dispatches.
    pub min_spacing: Duration,
    /// How often the cleanup sweep runs after the initial one.
    pub cleanup_interval: Duration,
    /// Completed rows older than this are swept.
    pub completed_retention: time::Duration,
    /// Failed rows older than this are swept.
    pub failed_retention: time::Duration,
    /// How long `stop` waits for in-flight work.
    pub stop_grace: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            min_spacing: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(3600),
            completed_retention: time::Duration::days(COMPLETED_TASK_RETENTION_DAYS),
            failed_retention: time::Duration::days(FAILED_TASK_RETENTION_DAYS),
            stop_grace: Duration::from_secs(5),
        }
    }
}

/// Snapshot of queue state for introspection endpoints.
#[derive(Debug, Clone, Copy)]
pub struct QueueStatus {
    pub counts: TaskCounts,
    pub executing: bool,
}

/// Durable single-worker task queue.
///
/// Exactly one task executes at a time; dispatches are spaced apart so a
/// burst of enqueues does not hammer upstream services. Rows interrupted
/// by a crash are returned to `pending` on the next `start`.
pub struct TaskQueue {
    store: Arc<dyn Store>,
    enricher: Arc<dyn Enrich>,
    config: QueueConfig,
    executing: AtomicBool,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl TaskQueue {
    pub fn new(store: Arc<dyn Store>, enricher: Arc<dyn Enrich>, config: QueueConfig) -> Arc<Self> {
        Arc::new(Self {
            store,
            enricher,
            config,
            executing: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        })
    }

    /// Recover interrupted tasks and launch the worker and cleanup loops.
    pub async fn start(self: &Arc<Self>) -> QueueResult<()> {
        let reset = self.store.reset_processing_tasks().await?;
        if reset > 0 {
            info!(count = reset, "recovered interrupted tasks");
        }

        let this = Arc::clone(self);
        self.tracker.spawn(async move { this.worker_loop().await });
        let this = Arc::clone(self);
        self.tracker.spawn(async move { this.cleanup_loop().await });
        Ok(())
    }

    /// Signal the loops to stop and wait up to the configured grace period
    /// for in-flight work to finish.
    pub async fn stop(&self) -> QueueResult<()> {
        self.cancel.cancel();
        self.tracker.close();
        timeout(self.config.stop_grace, self.tracker.wait())
            .await
            .map_err(|_| QueueError::StopTimeout(self.config.stop_grace))?;
        Ok(())
    }

    /// Enqueue an item. A no-op when an active task for the item already
    /// exists. Returns whether a task was created.
    pub async fn add_task(&self, item_id: &str) -> QueueResult<bool> {
        let inserted = self.store.insert_task(item_id).await?;
        if inserted {
            info!(item_id, "task enqueued");
        } else {
            debug!(item_id, "task already queued, skipping");
        }
        Ok(inserted)
    }

    /// Current per-state counts plus whether a task is executing.
    pub async fn status(&self) -> QueueResult<QueueStatus> {
        Ok(QueueStatus {
            counts: self.store.count_tasks().await?,
            executing: self.executing.load(Ordering::Acquire),
        })
    }

    /// Run one cleanup sweep immediately.
    pub async fn cleanup_now(&self) -> QueueResult<SweepOutcome> {
        let now = OffsetDateTime::now_utc();
        let outcome = self
            .store
            .sweep_tasks(
                now - self.config.completed_retention,
                now - self.config.failed_retention,
            )
            .await?;
        if outcome.completed_removed > 0 || outcome.failed_removed > 0 {
            info!(
                completed = outcome.completed_removed,
                failed = outcome.failed_removed,
                "swept finished tasks"
            );
        }
        Ok(outcome)
    }

    async fn worker_loop(self: Arc<Self>) {
        let mut tick = interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_dispatch: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tick.tick() => {}
            }
            if self.executing.load(Ordering::Acquire) {
                continue;
            }
            if let Some(at) = last_dispatch {
                if at.elapsed() < self.config.min_spacing {
                    continue;
                }
            }
            match self.store.dequeue_task().await {
                Ok(Some(task)) => {
                    last_dispatch = Some(Instant::now());
                    self.executing.store(true, Ordering::Release);
                    let this = Arc::clone(&self);
                    self.tracker.spawn(async move { this.execute(task).await });
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, "failed to dequeue task"),
            }
        }
        debug!("queue worker stopped");
    }

    async fn execute(&self, task: MediaTaskRow) {
        let attempt = task.retry_count + 1;
        debug!(task_id = task.task_id, item_id = %task.item_id, attempt, "executing task");

        let result = self.enricher.enrich(&task.item_id).await;
        let record = match result {
            Ok(()) => {
                info!(task_id = task.task_id, item_id = %task.item_id, "task completed");
                self.store.complete_task(task.task_id).await
            }
            Err(err) if attempt >= TASK_RETRY_LIMIT => {
                error!(
                    task_id = task.task_id,
                    item_id = %task.item_id,
                    attempt,
                    error = %err,
                    "task failed permanently"
                );
                self.store.fail_task(task.task_id, &format!("{err:#}")).await
            }
            Err(err) => {
                warn!(
                    task_id = task.task_id,
                    item_id = %task.item_id,
                    attempt,
                    error = %err,
                    "task attempt failed, will retry"
                );
                self.store.retry_task(task.task_id, &format!("{err:#}")).await
            }
        };
        if let Err(err) = record {
            error!(task_id = task.task_id, error = %err, "failed to record task outcome");
        }
        self.executing.store(false, Ordering::Release);
    }

    async fn cleanup_loop(self: Arc<Self>) {
        let mut tick = interval(self.config.cleanup_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            // First tick fires immediately: sweep once at startup.
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tick.tick() => {}
            }
            if let Err(err) = self.cleanup_now().await {
                warn!(error = %err, "cleanup sweep failed");
            }
        }
        debug!("queue cleanup stopped");
    }
}
