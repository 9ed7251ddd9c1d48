//! Cookie-authenticated drive client.
//!
//! Talks to the cloud drive's web API with a session cookie: resolve a
//! directory path to its id, list a directory (bounded), and fetch a
//! download URL bound to the caller's User-Agent.

use crate::error::{ResolveError, ResolveResult};
use cinegate_core::config::DriveConfig;
use reqwest::header::{COOKIE, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// One file entry from a directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "pc", default)]
    pub pickcode: String,
}

#[derive(Deserialize)]
struct DirIdResponse {
    state: bool,
    #[serde(default)]
    id: String,
    #[serde(default)]
    error: String,
}

#[derive(Deserialize)]
struct ListResponse {
    state: bool,
    #[serde(default)]
    data: Vec<DriveFile>,
    #[serde(default)]
    error: String,
}

#[derive(Deserialize)]
struct DownloadResponse {
    state: bool,
    #[serde(default)]
    file_url: String,
    #[serde(default)]
    error: String,
}

pub struct CookieDriveClient {
    http: reqwest::Client,
    base_url: String,
    cookie: String,
    list_limit: u32,
}

impl CookieDriveClient {
    pub fn new(cfg: &DriveConfig) -> ResolveResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.url.trim_end_matches('/').to_string(),
            cookie: cfg.cookie.clone(),
            list_limit: cfg.list_limit,
        })
    }

    /// Resolve a directory path to the drive's directory id.
    pub async fn dir_id(&self, dir_path: &str) -> ResolveResult<String> {
        let url = format!("{}/files/getid", self.base_url);
        let resp: DirIdResponse = self
            .http
            .get(url)
            .header(COOKIE, &self.cookie)
            .query(&[("path", dir_path)])
            .send()
            .await?
            .json()
            .await?;
        if !resp.state || resp.id.is_empty() {
            return Err(ResolveError::Backend(format!(
                "directory id lookup failed for {dir_path}: {}",
                resp.error
            )));
        }
        Ok(resp.id)
    }

    /// List a directory, bounded by the configured limit.
    pub async fn list_dir(&self, dir_id: &str) -> ResolveResult<Vec<DriveFile>> {
        let url = format!("{}/files", self.base_url);
        let limit = self.list_limit.to_string();
        let resp: ListResponse = self
            .http
            .get(url)
            .header(COOKIE, &self.cookie)
            .query(&[("cid", dir_id), ("limit", limit.as_str()), ("offset", "0")])
            .send()
            .await?
            .json()
            .await?;
        if !resp.state {
            return Err(ResolveError::Backend(format!(
                "directory listing failed for {dir_id}: {}",
                resp.error
            )));
        }
        debug!(dir_id, files = resp.data.len(), "drive directory listed");
        Ok(resp.data)
    }

    /// Fetch a CDN download URL for a pickcode. The URL is only valid for
    /// requests carrying the same User-Agent.
    pub async fn download_url(&self, pickcode: &str, user_agent: &str) -> ResolveResult<String> {
        let url = format!("{}/files/download", self.base_url);
        let resp: DownloadResponse = self
            .http
            .get(url)
            .header(COOKIE, &self.cookie)
            .header(USER_AGENT, user_agent)
            .query(&[("pickcode", pickcode)])
            .send()
            .await?
            .json()
            .await?;
        if !resp.state || resp.file_url.is_empty() {
            return Err(ResolveError::Backend(format!(
                "download url fetch failed for {pickcode}: {}",
                resp.error
            )));
        }
        Ok(resp.file_url)
    }
}
