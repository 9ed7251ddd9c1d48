//! SQLite-based store implementation.

use crate::error::StoreResult;
use crate::models::{MediaTaskRow, PickcodeRow};
use crate::repos::pickcodes::PickcodeRepo;
use crate::repos::tasks::{SweepOutcome, TaskCounts, TaskRepo, TaskStatus};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use time::OffsetDateTime;

/// Schema (embedded).
const SCHEMA: &str = include_str!("schema.sql");

/// SQLite-backed store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and apply the
    /// schema.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    crate::StoreError::Config(format!(
                        "cannot create data directory {}: {e}",
                        dir.display()
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.apply_schema().await?;
        tracing::info!(db_path = %path.display(), "relational store opened");
        Ok(store)
    }

    /// In-memory store for tests.
    pub async fn in_memory() -> StoreResult<Self> {
        // A single connection keeps every query on the same :memory: db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.apply_schema().await?;
        Ok(store)
    }

    async fn apply_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA.split(';') {
            let trimmed = statement.trim();
            let has_sql = trimmed
                .lines()
                .any(|line| !line.trim().is_empty() && !line.trim().starts_with("--"));
            if has_sql {
                sqlx::query(trimmed).execute(&self.pool).await?;
            }
        }
        Ok(())
    }

    /// Connectivity probe for startup checks.
    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Raw pool access, for migrations and test fixtures.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl PickcodeRepo for SqliteStore {
    async fn get_pickcode(&self, file_path: &str) -> StoreResult<Option<String>> {
        let row = sqlx::query_as::<_, PickcodeRow>("SELECT * FROM pickcodes WHERE file_path = ?")
            .bind(file_path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.pickcode))
    }

    async fn save_pickcode(&self, file_path: &str, pickcode: &str) -> StoreResult<()> {
        let now = OffsetDateTime::now_utc();
        sqlx::query(
            "INSERT INTO pickcodes (file_path, pickcode, created_at, updated_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(file_path) DO UPDATE SET \
                 pickcode = excluded.pickcode, \
                 updated_at = excluded.updated_at",
        )
        .bind(file_path)
        .bind(pickcode)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_pickcode(&self, file_path: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM pickcodes WHERE file_path = ?")
            .bind(file_path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_pickcodes(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM pickcodes")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_pickcodes(&self) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pickcodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl TaskRepo for SqliteStore {
    async fn insert_task(&self, item_id: &str) -> StoreResult<bool> {
        // Dedupe and insert in one statement so two enqueuers cannot both
        // slip past the existence check.
        let result = sqlx::query(
            "INSERT INTO media_tasks (item_id, status, created_at) \
             SELECT ?, 'pending', ? \
             WHERE NOT EXISTS (\
                 SELECT 1 FROM media_tasks \
                 WHERE item_id = ? AND status IN ('pending', 'processing')\
             )",
        )
        .bind(item_id)
        .bind(OffsetDateTime::now_utc())
        .bind(item_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reset_processing_tasks(&self) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE media_tasks SET status = 'pending', started_at = NULL \
             WHERE status = 'processing'",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn dequeue_task(&self) -> StoreResult<Option<MediaTaskRow>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, MediaTaskRow>(
            "SELECT * FROM media_tasks WHERE status = 'pending' \
             ORDER BY created_at ASC, task_id ASC LIMIT 1",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut task) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let started_at = OffsetDateTime::now_utc();
        let updated = sqlx::query(
            "UPDATE media_tasks SET status = 'processing', started_at = ? \
             WHERE task_id = ? AND status = 'pending'",
        )
        .bind(started_at)
        .bind(task.task_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Another worker claimed it between select and update.
            tx.rollback().await?;
            return Ok(None);
        }
        tx.commit().await?;

        task.status = TaskStatus::Processing.as_str().to_string();
        task.started_at = Some(started_at);
        Ok(Some(task))
    }

    async fn complete_task(&self, task_id: i64) -> StoreResult<()> {
        sqlx::query(
            "UPDATE media_tasks SET status = 'completed', completed_at = ? WHERE task_id = ?",
        )
        .bind(OffsetDateTime::now_utc())
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn retry_task(&self, task_id: i64, error: &str) -> StoreResult<()> {
        sqlx::query(
            "UPDATE media_tasks SET status = 'pending', error_message = ?, \
             retry_count = retry_count + 1 WHERE task_id = ?",
        )
        .bind(error)
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fail_task(&self, task_id: i64, error: &str) -> StoreResult<()> {
        sqlx::query(
            "UPDATE media_tasks SET status = 'failed', error_message = ?, \
             retry_count = retry_count + 1, completed_at = ? WHERE task_id = ?",
        )
        .bind(error)
        .bind(OffsetDateTime::now_utc())
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_task(&self, task_id: i64) -> StoreResult<Option<MediaTaskRow>> {
        let row = sqlx::query_as::<_, MediaTaskRow>("SELECT * FROM media_tasks WHERE task_id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn tasks_for_item(&self, item_id: &str) -> StoreResult<Vec<MediaTaskRow>> {
        let rows = sqlx::query_as::<_, MediaTaskRow>(
            "SELECT * FROM media_tasks WHERE item_id = ? ORDER BY created_at ASC, task_id ASC",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_tasks(&self) -> StoreResult<TaskCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM media_tasks GROUP BY status")
                .fetch_all(&self.pool)
                .await?;
        let mut counts = TaskCounts::default();
        for (status, count) in rows {
            match TaskStatus::parse(&status)? {
                TaskStatus::Pending => counts.pending = count as u64,
                TaskStatus::Processing => counts.processing = count as u64,
                TaskStatus::Completed => counts.completed = count as u64,
                TaskStatus::Failed => counts.failed = count as u64,
            }
        }
        Ok(counts)
    }

    async fn sweep_tasks(
        &self,
        completed_cutoff: OffsetDateTime,
        failed_cutoff: OffsetDateTime,
    ) -> StoreResult<SweepOutcome> {
        let completed = sqlx::query(
            "DELETE FROM media_tasks WHERE status = 'completed' AND completed_at < ?",
        )
        .bind(completed_cutoff)
        .execute(&self.pool)
        .await?;

        let failed =
            sqlx::query("DELETE FROM media_tasks WHERE status = 'failed' AND completed_at < ?")
                .bind(failed_cutoff)
                .execute(&self.pool)
                .await?;

        Ok(SweepOutcome {
            completed_removed: completed.rows_affected(),
            failed_removed: failed.rows_affected(),
        })
    }
}
