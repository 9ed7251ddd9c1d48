//! The cinegate HTTP gateway.
//!
//! Sits in front of an Emby-compatible media server. Playback requests are
//! intercepted and answered with a 302 to the real byte-serving location;
//! everything else is proxied through untouched. Webhook ingress feeds the
//! enrichment task queue, and a small admin surface exposes queue state.

pub mod error;
pub mod handlers;
pub mod media;
pub mod proxy;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use media::{MediaEnricher, MediaServerClient};
pub use proxy::ProxyClient;
pub use routes::create_router;
pub use state::AppState;
