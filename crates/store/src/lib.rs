//! SQLite-backed relational store.
//!
//! Holds the two durable tables shared across processes: the pickcode
//! cache (canonical file path → provider identifier) and the media task
//! table driving the enrichment queue. Consumers depend on the repo traits
//! rather than the SQLite implementation.

pub mod error;
pub mod models;
pub mod repos;
pub mod sqlite;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use models::{MediaTaskRow, PickcodeRow};
pub use repos::pickcodes::PickcodeRepo;
pub use repos::tasks::{SweepOutcome, TaskCounts, TaskRepo, TaskStatus};
pub use sqlite::SqliteStore;
pub use store::Store;

use std::sync::Arc;

/// Open the store described by the configuration.
pub async fn from_config(
    cfg: &cinegate_core::config::StoreConfig,
) -> StoreResult<Arc<dyn Store>> {
    let store = SqliteStore::open(&cfg.db_path).await?;
    Ok(Arc::new(store))
}
