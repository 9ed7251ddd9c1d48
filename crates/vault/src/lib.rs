//! Credential vault: durable storage and proactive refresh of the OAuth
//! token pair used against the cloud-drive open API.
//!
//! The vault has three pieces:
//! - [`CredentialStore`]: the token file plus its two-level locking
//!   discipline (process mutex, then OS advisory lock), safe against both
//!   in-process and cross-process concurrent writers.
//! - [`RefreshGate`]: the read/refresh coordination contract. Readers wait
//!   (bounded) while a refresh is in flight instead of observing a
//!   half-written pair.
//! - [`TokenRefresher`]: the background loop that proactively renews the
//!   pair ahead of the provider's expiry.

pub mod error;
pub mod gate;
pub mod refresher;
pub mod store;

pub use error::{VaultError, VaultResult};
pub use gate::RefreshGate;
pub use refresher::{RefresherConfig, TokenRefreshApi, TokenRefresher};
pub use store::{CredentialStore, LockOptions};
