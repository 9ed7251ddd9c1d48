//! OAuth open-API client for the cloud drive.
//!
//! Two roles: the refresh-token exchange used by the credential refresher,
//! and the authenticated metadata/download endpoints used by the
//! resolution cascade. Access tokens always come from the credential
//! store, never from a field, so a concurrent refresh is picked up
//! immediately.

use crate::error::{ResolveError, ResolveResult};
use async_trait::async_trait;
use cinegate_core::config::OpenApiConfig;
use cinegate_core::TokenPair;
use cinegate_vault::{CredentialStore, TokenRefreshApi, VaultError, VaultResult};
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize)]
struct Envelope<T> {
    state: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct RefreshData {
    access_token: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct FolderInfo {
    #[serde(default)]
    pick_code: String,
}

#[derive(Deserialize)]
struct DownUrlEntry {
    url: UrlField,
}

#[derive(Deserialize)]
struct UrlField {
    url: String,
}

/// Refresh-token exchange, injected into the vault's refresher.
pub struct OpenApiRefresh {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
}

impl OpenApiRefresh {
    pub fn new(cfg: &OpenApiConfig) -> VaultResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VaultError::Refresh(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.url.trim_end_matches('/').to_string(),
            client_id: cfg.client_id.clone(),
        })
    }
}

#[async_trait]
impl TokenRefreshApi for OpenApiRefresh {
    async fn refresh(&self, current: &TokenPair) -> VaultResult<TokenPair> {
        if current.refresh_token.is_empty() {
            return Err(VaultError::EmptyRefreshToken);
        }
        let url = format!("{}/open/refreshToken", self.base_url);
        let resp: Envelope<RefreshData> = self
            .http
            .post(url)
            .form(&[
                ("refresh_token", current.refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| VaultError::Refresh(e.to_string()))?
            .json()
            .await
            .map_err(|e| VaultError::Refresh(e.to_string()))?;
        let data = match resp.data {
            Some(data) if resp.state => data,
            _ => return Err(VaultError::Refresh(resp.message)),
        };
        Ok(TokenPair::new(data.refresh_token, data.access_token))
    }
}

/// Authenticated open-API operations.
pub struct OpenApiClient {
    http: reqwest::Client,
    base_url: String,
    store: CredentialStore,
}

impl OpenApiClient {
    pub fn new(cfg: &OpenApiConfig, store: CredentialStore) -> ResolveResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.url.trim_end_matches('/').to_string(),
            store,
        })
    }

    async fn bearer(&self) -> ResolveResult<String> {
        let pair = self.store.read().await?;
        if pair.access_token.is_empty() {
            return Err(ResolveError::NoAccessToken);
        }
        Ok(format!("Bearer {}", pair.access_token))
    }

    /// Look up a file's pickcode by its cloud path.
    pub async fn pickcode_by_path(&self, path: &str) -> ResolveResult<String> {
        let url = format!("{}/open/folder/get_info", self.base_url);
        let resp: Envelope<FolderInfo> = self
            .http
            .post(url)
            .header("Authorization", self.bearer().await?)
            .form(&[("path", path)])
            .send()
            .await?
            .json()
            .await?;
        let pick_code = resp.data.map(|d| d.pick_code).unwrap_or_default();
        if !resp.state || pick_code.is_empty() {
            return Err(ResolveError::NotFound(format!("{path}: {}", resp.message)));
        }
        Ok(pick_code)
    }

    /// Fetch a download URL for a pickcode, bound to the caller's
    /// User-Agent.
    pub async fn download_url(&self, pickcode: &str, user_agent: &str) -> ResolveResult<String> {
        let url = format!("{}/open/ufile/downurl", self.base_url);
        let resp: Envelope<HashMap<String, DownUrlEntry>> = self
            .http
            .post(url)
            .header("Authorization", self.bearer().await?)
            .header(USER_AGENT, user_agent)
            .form(&[("pick_code", pickcode)])
            .send()
            .await?
            .json()
            .await?;
        // The response maps file id to URL; a single pickcode yields one
        // entry, take whichever comes first.
        let Envelope {
            state,
            message,
            data,
        } = resp;
        let entry = data
            .filter(|_| state)
            .and_then(|map| map.into_values().next())
            .ok_or(ResolveError::Backend(message))?;
        debug!(pickcode, "open-api download url fetched");
        Ok(entry.url.url)
    }
}
