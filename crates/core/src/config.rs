//! Configuration types shared across crates.
//!
//! The binaries assemble the final [`AppConfig`] with figment (TOML file
//! merged with `CINEGATE_`-prefixed environment variables); everything here
//! is plain serde with per-field defaults so a minimal config file works.

use crate::rules::PathRule;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub media_server: MediaServerConfig,
    #[serde(default)]
    pub resolve: ResolveConfig,
    #[serde(default)]
    pub direct_link: DirectLinkConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub open_api: OpenApiConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl AppConfig {
    /// Validate cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        if self.media_server.url.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "media_server.url must be set".into(),
            ));
        }
        if !self.media_server.url.starts_with("http://")
            && !self.media_server.url.starts_with("https://")
        {
            return Err(crate::Error::InvalidConfig(
                "media_server.url must start with http:// or https://".into(),
            ));
        }
        if self.direct_link.sign && self.direct_link.token.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "direct_link.sign requires direct_link.token".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP gateway configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8095").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enqueue enrichment tasks for `library.new` webhook events.
    #[serde(default)]
    pub process_new_media: bool,
    /// On playback start, also enqueue enrichment for the next episode.
    #[serde(default)]
    pub prefetch_next_episode: bool,
}

/// Upstream media server (Emby-compatible REST surface).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MediaServerConfig {
    /// Base URL of the media server, e.g. "http://emby:8096".
    #[serde(default)]
    pub url: String,
    /// API key appended to every request.
    #[serde(default)]
    pub api_key: String,
    /// Admin user id, required for next-episode lookups.
    #[serde(default)]
    pub admin_user_id: String,
}

/// Redirect resolution configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Backend preference for the resolution cascade.
    #[serde(default)]
    pub method: ResolveMethod,
    /// Lifetime of resolved redirects in the in-memory cache, in minutes.
    #[serde(default = "default_redirect_cache_minutes")]
    pub redirect_cache_minutes: u64,
    /// Persist provider identifiers (pickcodes) in the durable cache table.
    #[serde(default = "default_true")]
    pub cache_pickcodes: bool,
    /// Path-mapping rules, evaluated in order, first match wins.
    #[serde(default)]
    pub paths: Vec<PathRule>,
}

/// Ordered backend strategy for producing a redirect.
///
/// A closed set: free-form method strings from older deployments are
/// rejected at config load rather than warned about at request time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMethod {
    /// Direct-link service only.
    #[default]
    DirectLink,
    /// Cookie driver first, open API second, direct link last.
    Cookie,
    /// Alias of `Cookie` kept for configs written against the legacy
    /// "ck+115open" spelling.
    CookieOpen,
    /// Open API first, direct link as fallback. No cookie driver.
    OpenApi,
}

impl ResolveMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectLink => "direct_link",
            Self::Cookie => "cookie",
            Self::CookieOpen => "cookie_open",
            Self::OpenApi => "open_api",
        }
    }

    /// Whether this method consults the cookie driver.
    pub fn uses_cookie_driver(&self) -> bool {
        matches!(self, Self::Cookie | Self::CookieOpen)
    }
}

impl FromStr for ResolveMethod {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "direct_link" => Ok(Self::DirectLink),
            "cookie" => Ok(Self::Cookie),
            "cookie_open" => Ok(Self::CookieOpen),
            "open_api" => Ok(Self::OpenApi),
            other => Err(crate::Error::UnknownResolveMethod(other.to_string())),
        }
    }
}

/// Direct-link service (alist-style `/d{path}` redirects).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DirectLinkConfig {
    /// Base URL of the direct-link service.
    #[serde(default)]
    pub url: String,
    /// Shared secret for HMAC signing of direct links.
    #[serde(default)]
    pub token: String,
    /// Append a `sign` query parameter to direct links.
    #[serde(default)]
    pub sign: bool,
}

/// Cookie-authenticated cloud-drive backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Base URL of the drive API.
    #[serde(default)]
    pub url: String,
    /// Session cookie presented on every drive request.
    #[serde(default)]
    pub cookie: String,
    /// Maximum entries fetched per directory listing.
    #[serde(default = "default_list_limit")]
    pub list_limit: u32,
}

/// OAuth open-API cloud-drive backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OpenApiConfig {
    /// Base URL of the open API.
    #[serde(default)]
    pub url: String,
    /// OAuth client id presented during token refresh.
    #[serde(default)]
    pub client_id: String,
}

/// Credential vault configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Directory holding the token file and its lock sentinel.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// File-lock acquisition timeout in seconds. Ignored when
    /// `lock_nonblocking` is set.
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
    /// Fail immediately instead of waiting when the lock is contended.
    #[serde(default)]
    pub lock_nonblocking: bool,
    /// Refresher check interval in seconds.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Token age beyond which a proactive refresh is triggered, in seconds.
    /// Kept shorter than the provider's real expiry.
    #[serde(default = "default_token_max_age_secs")]
    pub token_max_age_secs: u64,
}

impl VaultConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn token_max_age(&self) -> Duration {
        Duration::from_secs(self.token_max_age_secs)
    }
}

/// Relational store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_bind() -> String {
    "127.0.0.1:8095".to_string()
}

fn default_redirect_cache_minutes() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_list_limit() -> u32 {
    1150
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_lock_timeout_secs() -> u64 {
    5
}

fn default_check_interval_secs() -> u64 {
    600 // 10 minutes
}

fn default_token_max_age_secs() -> u64 {
    4800 // 80 minutes
}

fn default_db_path() -> String {
    "./data/cinegate.db".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            process_new_media: false,
            prefetch_next_episode: false,
        }
    }
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            method: ResolveMethod::default(),
            redirect_cache_minutes: default_redirect_cache_minutes(),
            cache_pickcodes: true,
            paths: Vec::new(),
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            cookie: String::new(),
            list_limit: default_list_limit(),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            lock_timeout_secs: default_lock_timeout_secs(),
            lock_nonblocking: false,
            check_interval_secs: default_check_interval_secs(),
            token_max_age_secs: default_token_max_age_secs(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}
