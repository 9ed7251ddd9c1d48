//! Redirect resolution.
//!
//! Turns a media file path into the URL that actually serves the bytes,
//! cascading across the configured backends: a direct-link service, a
//! cookie-authenticated drive client and the drive's OAuth open API.
//! Resolution never hard-fails a playback request; exhausting the cascade
//! degrades to pass-through proxying.

pub mod cache;
pub mod dlink;
pub mod driver;
pub mod engine;
pub mod error;
pub mod openapi;
pub mod pool;
pub mod sign;

pub use cache::RedirectCache;
pub use dlink::DirectLinkClient;
pub use driver::{CookieDriveClient, DriveFile};
pub use engine::{Resolution, ResolverEngine};
pub use error::{ResolveError, ResolveResult};
pub use openapi::{OpenApiClient, OpenApiRefresh};
pub use pool::BackgroundPool;
pub use sign::sign_path;
