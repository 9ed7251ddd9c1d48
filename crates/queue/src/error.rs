//! Queue error types.

use thiserror::Error;

/// Errors surfaced by queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] cinegate_store::StoreError),

    #[error("queue worker did not stop within {0:?}")]
    StopTimeout(std::time::Duration),
}

/// Result type for queue operations.
pub type QueueResult<T> = std::result::Result<T, QueueError>;
