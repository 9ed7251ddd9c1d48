//! Media-server REST client.
//!
//! A thin client for the Emby-compatible surface the gateway needs: item
//! lookup (file path, season linkage), playback-info fetch (which doubles
//! as the enrichment side effect: the media server fills in missing
//! metadata while answering) and episode listing for next-episode
//! prefetch.

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use cinegate_core::config::MediaServerConfig;
use cinegate_queue::Enrich;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct MediaItem {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Path", default)]
    pub path: String,
    #[serde(rename = "SeasonId", default)]
    pub season_id: String,
    #[serde(rename = "IndexNumber", default)]
    pub index_number: Option<i64>,
}

#[derive(Deserialize)]
struct ItemPage {
    #[serde(rename = "Items", default)]
    items: Vec<MediaItem>,
}

#[derive(Deserialize)]
struct PlaybackInfo {
    #[serde(rename = "MediaSources", default)]
    media_sources: Vec<serde_json::Value>,
}

pub struct MediaServerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    admin_user_id: String,
}

impl MediaServerClient {
    pub fn new(cfg: &MediaServerConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(Self {
            http,
            base_url: cfg.url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            admin_user_id: cfg.admin_user_id.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "{path} returned {}",
                resp.status()
            )));
        }
        resp.json()
            .await
            .map_err(|e| ApiError::Upstream(format!("{path}: {e}")))
    }

    /// Item lookup, including the storage path.
    pub async fn item(&self, item_id: &str) -> ApiResult<MediaItem> {
        self.get_json(&format!("/emby/Items/{item_id}"), &[]).await
    }

    /// Fetch playback info. The media server enriches the item's metadata
    /// as a side effect. Returns the number of media sources.
    pub async fn playback_info(&self, item_id: &str) -> ApiResult<usize> {
        let info: PlaybackInfo = self
            .get_json(&format!("/emby/Items/{item_id}/PlaybackInfo"), &[])
            .await?;
        debug!(item_id, sources = info.media_sources.len(), "playback info fetched");
        Ok(info.media_sources.len())
    }

    /// The episode following `item_id` within its season, if any. Needs
    /// the configured admin user for the user-scoped item endpoints.
    pub async fn next_episode(&self, item_id: &str) -> ApiResult<Option<String>> {
        if self.admin_user_id.is_empty() {
            return Err(ApiError::BadRequest(
                "media_server.admin_user_id is required for next-episode lookup".into(),
            ));
        }
        let item: MediaItem = self
            .get_json(
                &format!("/emby/Users/{}/Items/{item_id}", self.admin_user_id),
                &[],
            )
            .await?;
        if item.season_id.is_empty() {
            return Ok(None);
        }
        let page: ItemPage = self
            .get_json(
                &format!("/emby/Users/{}/Items", self.admin_user_id),
                &[
                    ("ParentId", item.season_id.as_str()),
                    ("Recursive", "true"),
                    ("IsFolder", "false"),
                ],
            )
            .await?;
        // IndexNumber is 1-based, so it doubles as the index of the next
        // episode in the season listing.
        let Some(index) = item.index_number.filter(|&n| n > 0) else {
            return Ok(None);
        };
        Ok(page.items.get(index as usize).map(|next| next.id.clone()))
    }
}

/// The queue's enrichment callback: a playback-info fetch per item.
pub struct MediaEnricher {
    media: Arc<MediaServerClient>,
}

impl MediaEnricher {
    pub fn new(media: Arc<MediaServerClient>) -> Self {
        Self { media }
    }
}

#[async_trait]
impl Enrich for MediaEnricher {
    async fn enrich(&self, item_id: &str) -> anyhow::Result<()> {
        let sources = self.media.playback_info(item_id).await?;
        if sources == 0 {
            warn!(item_id, "item has no media sources");
            anyhow::bail!("no media sources for item {item_id}");
        }
        Ok(())
    }
}
