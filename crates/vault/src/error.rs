//! Vault error types.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the credential vault.
///
/// Lock contention is deliberately distinct from I/O and parse failures so
/// callers can decide between retrying and failing fast.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("credential lock not acquired within {0:?}; another process may be writing tokens")]
    LockTimeout(Duration),

    #[error("credential lock is held by another process")]
    LockBusy,

    #[error("refresh token is empty, nothing to refresh with")]
    EmptyRefreshToken,

    #[error("token refresh call failed: {0}")]
    Refresh(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("token file parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl VaultError {
    /// Transient contention on the advisory lock (retryable).
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, Self::LockTimeout(_) | Self::LockBusy)
    }
}

/// Result type for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;
