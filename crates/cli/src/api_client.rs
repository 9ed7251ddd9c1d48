use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Mirror of the server's `/admin/queue` payload.
#[derive(Debug, Deserialize)]
pub struct QueueStatus {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub executing: bool,
}

pub async fn queue_status(base_url: &str) -> anyhow::Result<QueueStatus> {
    let url = format!("{}/admin/queue", base_url.trim_end_matches('/'));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build the HTTP client")?;
    let resp = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;
    if !resp.status().is_success() {
        anyhow::bail!("server returned {} for {url}", resp.status());
    }
    resp.json::<QueueStatus>()
        .await
        .context("failed to decode the queue status response")
}
