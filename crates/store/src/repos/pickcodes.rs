//! Pickcode cache repository.

use crate::error::StoreResult;
use async_trait::async_trait;

/// Repository for the durable file-path → pickcode cache.
///
/// Entries never expire on their own; invalidation is always explicit.
#[async_trait]
pub trait PickcodeRepo: Send + Sync {
    /// Look up the cached pickcode for a canonical file path.
    async fn get_pickcode(&self, file_path: &str) -> StoreResult<Option<String>>;

    /// Insert or replace the pickcode for a file path.
    async fn save_pickcode(&self, file_path: &str, pickcode: &str) -> StoreResult<()>;

    /// Remove a single entry. Returns whether it existed.
    async fn delete_pickcode(&self, file_path: &str) -> StoreResult<bool>;

    /// Drop the entire cache. Returns the number of removed entries.
    async fn clear_pickcodes(&self) -> StoreResult<u64>;

    /// Number of cached entries.
    async fn count_pickcodes(&self) -> StoreResult<u64>;
}
