//! Resolver error types.

use thiserror::Error;

/// Errors from backend clients. Inside the engine cascade these are logged
/// and degraded; they only surface from direct client calls.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend rejected request: {0}")]
    Backend(String),

    #[error("expected redirect, got status {0}")]
    NotRedirected(u16),

    #[error("redirect response carries no usable location")]
    MissingLocation,

    #[error("file not found in backend: {0}")]
    NotFound(String),

    #[error("no access token available")]
    NoAccessToken,

    #[error(transparent)]
    Vault(#[from] cinegate_vault::VaultError),

    #[error(transparent)]
    Store(#[from] cinegate_store::StoreError),
}

/// Result type for resolver operations.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
