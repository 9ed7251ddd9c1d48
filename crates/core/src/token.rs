//! The OAuth refresh/access token pair persisted by the credential vault.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;

/// A refresh/access token pair with its last write timestamp.
///
/// `updated_at` is `None` only for the zero value returned when no backing
/// file exists yet; every successful write stamps it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

impl TokenPair {
    /// A fully specified pair stamped with the current time.
    pub fn new(refresh_token: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
            access_token: access_token.into(),
            updated_at: Some(OffsetDateTime::now_utc()),
        }
    }

    /// True when neither field has been set.
    pub fn is_empty(&self) -> bool {
        self.refresh_token.is_empty() && self.access_token.is_empty()
    }

    /// Merge non-empty fields of an incoming update over this pair and
    /// stamp `updated_at`. Empty strings leave the previous value intact.
    pub fn merge(&mut self, refresh_token: &str, access_token: &str) {
        if !refresh_token.is_empty() {
            self.refresh_token = refresh_token.to_string();
        }
        if !access_token.is_empty() {
            self.access_token = access_token.to_string();
        }
        self.updated_at = Some(OffsetDateTime::now_utc());
    }

    /// Whether the pair can still be used: both fields present, a write
    /// timestamp recorded, and younger than `max_age`.
    pub fn is_valid(&self, max_age: Duration) -> bool {
        if self.refresh_token.is_empty() || self.access_token.is_empty() {
            return false;
        }
        match self.updated_at {
            None => false,
            Some(at) => OffsetDateTime::now_utc() - at < max_age,
        }
    }

    /// Age of the pair, if it has ever been written.
    pub fn age(&self) -> Option<time::Duration> {
        self.updated_at.map(|at| OffsetDateTime::now_utc() - at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_value_is_empty_and_invalid() {
        let pair = TokenPair::default();
        assert!(pair.is_empty());
        assert!(!pair.is_valid(Duration::from_secs(3600)));
    }

    #[test]
    fn merge_keeps_previous_value_for_empty_fields() {
        let mut pair = TokenPair::new("r1", "a1");
        pair.merge("", "a2");
        assert_eq!(pair.refresh_token, "r1");
        assert_eq!(pair.access_token, "a2");

        pair.merge("r2", "");
        assert_eq!(pair.refresh_token, "r2");
        assert_eq!(pair.access_token, "a2");
    }

    #[test]
    fn validity_depends_on_age() {
        let pair = TokenPair::new("r", "a");
        assert!(pair.is_valid(Duration::from_secs(3600)));
        assert!(!pair.is_valid(Duration::ZERO));
    }

    #[test]
    fn missing_timestamp_is_invalid_even_with_fields() {
        let pair = TokenPair {
            refresh_token: "r".into(),
            access_token: "a".into(),
            updated_at: None,
        };
        assert!(!pair.is_valid(Duration::from_secs(3600)));
    }

    #[test]
    fn json_round_trip() {
        let pair = TokenPair::new("r", "a");
        let json = serde_json::to_string(&pair).unwrap();
        let back: TokenPair = serde_json::from_str(&json).unwrap();
        assert_eq!(pair, back);
    }
}
