//! Media task repository.

use crate::error::{StoreError, StoreResult};
use crate::models::MediaTaskRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Lifecycle state of a media enrichment task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> StoreResult<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(StoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// Per-state row counts for queue introspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Rows removed by one cleanup sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub completed_removed: u64,
    pub failed_removed: u64,
}

/// Repository for the durable media task table.
#[async_trait]
pub trait TaskRepo: Send + Sync {
    /// Insert a pending task unless a pending/processing row for the same
    /// item already exists. Returns whether a row was inserted.
    async fn insert_task(&self, item_id: &str) -> StoreResult<bool>;

    /// Crash recovery: put every `processing` row back to `pending`.
    /// Returns the number of rows reset.
    async fn reset_processing_tasks(&self) -> StoreResult<u64>;

    /// Atomically claim the oldest pending task: select it and mark it
    /// `processing` with a start timestamp inside one transaction. Returns
    /// `None` when no pending row exists.
    async fn dequeue_task(&self) -> StoreResult<Option<MediaTaskRow>>;

    /// Mark a task completed.
    async fn complete_task(&self, task_id: i64) -> StoreResult<()>;

    /// Record a failed attempt and reschedule the task to `pending`.
    async fn retry_task(&self, task_id: i64, error: &str) -> StoreResult<()>;

    /// Record a failed attempt and terminally fail the task.
    async fn fail_task(&self, task_id: i64, error: &str) -> StoreResult<()>;

    /// Fetch a task by id.
    async fn get_task(&self, task_id: i64) -> StoreResult<Option<MediaTaskRow>>;

    /// All rows for an item, oldest first.
    async fn tasks_for_item(&self, item_id: &str) -> StoreResult<Vec<MediaTaskRow>>;

    /// Per-state row counts.
    async fn count_tasks(&self) -> StoreResult<TaskCounts>;

    /// Delete completed rows finished before `completed_cutoff` and failed
    /// rows finished before `failed_cutoff`. Pending/processing rows are
    /// never touched.
    async fn sweep_tasks(
        &self,
        completed_cutoff: OffsetDateTime,
        failed_cutoff: OffsetDateTime,
    ) -> StoreResult<SweepOutcome>;
}
