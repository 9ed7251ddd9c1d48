//! Direct-link service client.
//!
//! The direct-link service answers `GET /d<path>` with a 302 to the CDN.
//! The client never follows redirects; it only extracts the `Location`.

use crate::error::{ResolveError, ResolveResult};
use crate::sign::sign_path;
use cinegate_core::config::DirectLinkConfig;
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

pub struct DirectLinkClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    sign: bool,
}

impl DirectLinkClient {
    pub fn new(cfg: &DirectLinkConfig) -> ResolveResult<Self> {
        let http = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.url.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
            sign: cfg.sign,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether `path` already points into the direct-link service.
    pub fn is_service_url(&self, path: &str) -> bool {
        !self.base_url.is_empty() && path.starts_with(&self.base_url)
    }

    /// Build the `/d` URL for a media path, signing it when configured.
    pub fn direct_url(&self, path: &str) -> String {
        let mut url = if self.is_service_url(path) {
            path.to_string()
        } else {
            format!("{}/d{}", self.base_url, path)
        };
        if self.sign {
            url = format!("{}?sign={}", url, sign_path(&self.token, path, 0));
        }
        url
    }

    /// Issue a non-following GET and return the 302 target. Any other
    /// status is an error.
    pub async fn resolve_redirect(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> ResolveResult<String> {
        let resp = self.http.get(url).headers(headers).send().await?;
        if resp.status() != StatusCode::FOUND {
            return Err(ResolveError::NotRedirected(resp.status().as_u16()));
        }
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ResolveError::MissingLocation)?;
        // Location may be relative; resolve it against the request URL.
        let absolute = resp
            .url()
            .join(location)
            .map_err(|_| ResolveError::MissingLocation)?;
        debug!(%url, target = %absolute, "direct-link redirect resolved");
        Ok(absolute.to_string())
    }

    /// Resolve a media path end to end: build the URL, then extract the
    /// redirect target.
    pub async fn resolve_path(&self, path: &str, headers: HeaderMap) -> ResolveResult<String> {
        let url = self.direct_url(path);
        self.resolve_redirect(&url, headers).await
    }
}
