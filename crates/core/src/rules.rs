//! Path-mapping rules and media path normalization.
//!
//! The media server reports file paths in whatever form its library was
//! scanned with (possibly Windows-style). Before matching we normalize to a
//! forward-slash absolute path, then translate via the first matching rule.

use serde::{Deserialize, Serialize};

/// A single path-mapping rule from configuration.
///
/// `old_prefix` selects paths subject to resolution; `new_prefix` is the
/// direct-link service's view of the same tree; `real_prefix` the cloud
/// drive's view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRule {
    #[serde(rename = "old")]
    pub old_prefix: String,
    #[serde(rename = "new")]
    pub new_prefix: String,
    #[serde(rename = "real")]
    pub real_prefix: String,
}

impl PathRule {
    /// Rewrite `path` for the direct-link backend.
    pub fn to_direct_link(&self, path: &str) -> String {
        replace_prefix(path, &self.old_prefix, &self.new_prefix)
    }

    /// Rewrite `path` for the cloud-drive backends.
    pub fn to_cloud(&self, path: &str) -> String {
        replace_prefix(path, &self.old_prefix, &self.real_prefix)
    }
}

/// Ordered rule set; first match wins.
#[derive(Clone, Debug, Default)]
pub struct PathRules(Vec<PathRule>);

impl PathRules {
    pub fn new(rules: Vec<PathRule>) -> Self {
        Self(rules)
    }

    /// Find the first rule whose `old_prefix` matches the normalized path.
    /// Returns `None` when the path is not subject to resolution.
    pub fn match_rule(&self, normalized_path: &str) -> Option<&PathRule> {
        self.0
            .iter()
            .find(|rule| normalized_path.starts_with(&rule.old_prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn replace_prefix(path: &str, from: &str, to: &str) -> String {
    match path.strip_prefix(from) {
        Some(rest) => format!("{to}{rest}"),
        None => path.to_string(),
    }
}

/// Normalize a media path: convert backslashes, drop a Windows drive
/// letter, and ensure a leading slash.
pub fn normalize_media_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    let without_drive = strip_drive_letter(path);
    let forward = without_drive.replace('\\', "/");
    if forward.starts_with('/') {
        forward
    } else {
        format!("/{forward}")
    }
}

fn strip_drive_letter(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        let rest = &path[2..];
        rest.trim_start_matches(['/', '\\'])
    } else {
        path
    }
}
