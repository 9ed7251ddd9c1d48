//! Media task repository tests: dedupe, transactional dequeue, retry
//! bookkeeping, crash recovery and the cleanup sweep.

use cinegate_store::{SqliteStore, TaskRepo, TaskStatus};
use time::{Duration, OffsetDateTime};

#[tokio::test]
async fn insert_dedupes_active_tasks_per_item() {
    let store = SqliteStore::in_memory().await.unwrap();

    assert!(store.insert_task("item-1").await.unwrap());
    // Second enqueue while pending: no-op, not an error.
    assert!(!store.insert_task("item-1").await.unwrap());

    let task = store.dequeue_task().await.unwrap().unwrap();
    assert_eq!(task.item_id, "item-1");
    // Still deduped while processing.
    assert!(!store.insert_task("item-1").await.unwrap());

    store.complete_task(task.task_id).await.unwrap();
    // Completed rows no longer block a fresh enqueue.
    assert!(store.insert_task("item-1").await.unwrap());

    let rows = store.tasks_for_item("item-1").await.unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn dequeue_claims_oldest_pending_and_stamps_start() {
    let store = SqliteStore::in_memory().await.unwrap();
    store.insert_task("first").await.unwrap();
    store.insert_task("second").await.unwrap();

    let task = store.dequeue_task().await.unwrap().unwrap();
    assert_eq!(task.item_id, "first");
    assert_eq!(task.status, TaskStatus::Processing.as_str());
    assert!(task.started_at.is_some());

    let task = store.dequeue_task().await.unwrap().unwrap();
    assert_eq!(task.item_id, "second");

    assert!(store.dequeue_task().await.unwrap().is_none());
}

#[tokio::test]
async fn retry_then_fail_records_attempts() {
    let store = SqliteStore::in_memory().await.unwrap();
    store.insert_task("flaky").await.unwrap();

    let task = store.dequeue_task().await.unwrap().unwrap();
    store.retry_task(task.task_id, "boom 1").await.unwrap();

    let row = store.get_task(task.task_id).await.unwrap().unwrap();
    assert_eq!(row.status, TaskStatus::Pending.as_str());
    assert_eq!(row.retry_count, 1);
    assert_eq!(row.error_message.as_deref(), Some("boom 1"));

    let task = store.dequeue_task().await.unwrap().unwrap();
    store.retry_task(task.task_id, "boom 2").await.unwrap();
    let task = store.dequeue_task().await.unwrap().unwrap();
    store.fail_task(task.task_id, "boom 3").await.unwrap();

    let row = store.get_task(task.task_id).await.unwrap().unwrap();
    assert_eq!(row.status, TaskStatus::Failed.as_str());
    assert_eq!(row.retry_count, 3);
    assert_eq!(row.error_message.as_deref(), Some("boom 3"));
    assert!(row.completed_at.is_some());
}

#[tokio::test]
async fn reset_returns_interrupted_tasks_to_pending() {
    let store = SqliteStore::in_memory().await.unwrap();
    store.insert_task("a").await.unwrap();
    store.insert_task("b").await.unwrap();
    store.dequeue_task().await.unwrap().unwrap();

    // Simulated crash: the processing row is recovered on restart.
    assert_eq!(store.reset_processing_tasks().await.unwrap(), 1);

    let counts = store.count_tasks().await.unwrap();
    assert_eq!(counts.pending, 2);
    assert_eq!(counts.processing, 0);
}

#[tokio::test]
async fn counts_group_by_status() {
    let store = SqliteStore::in_memory().await.unwrap();
    store.insert_task("x").await.unwrap();
    store.insert_task("y").await.unwrap();
    let task = store.dequeue_task().await.unwrap().unwrap();
    store.complete_task(task.task_id).await.unwrap();

    let counts = store.count_tasks().await.unwrap();
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.processing, 0);
    assert_eq!(counts.failed, 0);
}

async fn backdate_completed(store: &SqliteStore, task_id: i64, days: i64) {
    sqlx::query("UPDATE media_tasks SET completed_at = ? WHERE task_id = ?")
        .bind(OffsetDateTime::now_utc() - Duration::days(days))
        .bind(task_id)
        .execute(store.pool())
        .await
        .unwrap();
}

#[tokio::test]
async fn sweep_honors_retention_boundaries() {
    let store = SqliteStore::in_memory().await.unwrap();

    // Completed 8 days ago: swept. Completed 6 days ago: retained.
    for (item, days) in [("old-done", 8), ("new-done", 6)] {
        store.insert_task(item).await.unwrap();
        let task = store.dequeue_task().await.unwrap().unwrap();
        store.complete_task(task.task_id).await.unwrap();
        backdate_completed(&store, task.task_id, days).await;
    }
    // Failed 31 days ago: swept. Failed 29 days ago: retained.
    for (item, days) in [("old-fail", 31), ("new-fail", 29)] {
        store.insert_task(item).await.unwrap();
        let task = store.dequeue_task().await.unwrap().unwrap();
        store.fail_task(task.task_id, "broken").await.unwrap();
        backdate_completed(&store, task.task_id, days).await;
    }
    // A pending row far older than any window must survive.
    store.insert_task("ancient-pending").await.unwrap();

    let now = OffsetDateTime::now_utc();
    let outcome = store
        .sweep_tasks(now - Duration::days(7), now - Duration::days(30))
        .await
        .unwrap();
    assert_eq!(outcome.completed_removed, 1);
    assert_eq!(outcome.failed_removed, 1);

    assert!(store.tasks_for_item("old-done").await.unwrap().is_empty());
    assert_eq!(store.tasks_for_item("new-done").await.unwrap().len(), 1);
    assert!(store.tasks_for_item("old-fail").await.unwrap().is_empty());
    assert_eq!(store.tasks_for_item("new-fail").await.unwrap().len(), 1);
    assert_eq!(
        store.tasks_for_item("ancient-pending").await.unwrap().len(),
        1
    );
}
