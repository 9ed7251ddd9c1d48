//! Task execution seam.

use async_trait::async_trait;

/// One unit of queue work: enrich a media item end to end.
///
/// Implementations are expected to be idempotent; the queue re-runs the
/// same item after a failed attempt and after crash recovery.
#[async_trait]
pub trait Enrich: Send + Sync {
    async fn enrich(&self, item_id: &str) -> anyhow::Result<()>;
}
