//! Redirect-cache request fingerprinting.
//!
//! Resolved download URLs are both time-limited and bound to the requesting
//! User-Agent, so cached redirects must be scoped to the same identity: the
//! fingerprint covers the request URI (query stripped, playback clients
//! vary tokens there) and the User-Agent.

use sha2::{Digest, Sha256};

/// Compute the cache key for a resolved redirect.
pub fn request_fingerprint(request_uri: &str, user_agent: &str) -> String {
    let uri = strip_query(request_uri);
    let mut hasher = Sha256::new();
    hasher.update(uri.as_bytes());
    hasher.update(b"-");
    hasher.update(user_agent.as_bytes());
    hex_encode(&hasher.finalize())
}

fn strip_query(uri: &str) -> &str {
    match uri.split_once('?') {
        Some((path, _)) => path,
        None => uri,
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(out, "{b:02x}");
    }
    out
}
