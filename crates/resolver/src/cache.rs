//! In-memory TTL cache of resolved redirect URLs.

use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Entry {
    url: String,
    expires_at: Instant,
}

/// Process-local cache keyed by request fingerprint. Entries live for the
/// configured TTL; stale entries are dropped on access and by `purge`.
pub struct RedirectCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
}

impl RedirectCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, fingerprint: &str) -> Option<String> {
        // The shard guard must drop before the remove below.
        let stale = match self.entries.get(fingerprint) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.url.clone()),
            Some(_) => true,
            None => false,
        };
        if stale {
            self.entries.remove(fingerprint);
        }
        None
    }

    pub fn insert(&self, fingerprint: String, url: String) {
        self.entries.insert(
            fingerprint,
            Entry {
                url,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop every expired entry.
    pub fn purge(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
