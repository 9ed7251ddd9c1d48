//! Request handlers.

pub mod admin;
pub mod play;
pub mod sessions;
pub mod webhook;

pub use admin::{cache_clear, cache_status, health_check, queue_cleanup, queue_status};
pub use play::gateway;
pub use webhook::webhook;
