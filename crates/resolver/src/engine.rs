//! The resolution cascade.

use crate::dlink::DirectLinkClient;
use crate::driver::{CookieDriveClient, DriveFile};
use crate::openapi::OpenApiClient;
use crate::pool::BackgroundPool;
use cinegate_core::config::{AppConfig, ResolveMethod};
use cinegate_core::rules::{normalize_media_path, PathRule, PathRules};
use cinegate_store::Store;
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a resolution attempt. Backends never surface hard errors to
/// a playback request; exhausting every fallback means pass-through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Answer the player with a 302 to this URL.
    Redirect(String),
    /// Let the media server stream the file itself.
    PassThrough,
}

pub struct ResolverEngine {
    rules: PathRules,
    method: ResolveMethod,
    cache_pickcodes: bool,
    direct_link: DirectLinkClient,
    driver: Option<CookieDriveClient>,
    open_api: Option<OpenApiClient>,
    store: Arc<dyn Store>,
    pool: Arc<BackgroundPool>,
}

impl ResolverEngine {
    pub fn new(
        cfg: &AppConfig,
        direct_link: DirectLinkClient,
        driver: Option<CookieDriveClient>,
        open_api: Option<OpenApiClient>,
        store: Arc<dyn Store>,
        pool: Arc<BackgroundPool>,
    ) -> Self {
        Self {
            rules: PathRules::new(cfg.resolve.paths.clone()),
            method: cfg.resolve.method,
            cache_pickcodes: cfg.resolve.cache_pickcodes,
            direct_link,
            driver,
            open_api,
            store,
            pool,
        }
    }

    /// Resolve a media path to its byte-serving URL.
    pub async fn resolve(
        &self,
        media_path: &str,
        user_agent: &str,
        headers: &HeaderMap,
    ) -> Resolution {
        let path = normalize_media_path(media_path);

        // A path that already points into the direct-link service skips
        // the rule table entirely.
        if self.direct_link.is_service_url(&path) {
            return match self.direct_link.resolve_path(&path, headers.clone()).await {
                Ok(url) => Resolution::Redirect(url),
                Err(err) => {
                    warn!(%path, error = %err, "direct-link resolution failed");
                    Resolution::PassThrough
                }
            };
        }

        let Some(rule) = self.rules.match_rule(&path) else {
            debug!(%path, "no path rule matched, passing through");
            return Resolution::PassThrough;
        };

        match self.method {
            ResolveMethod::DirectLink => self.via_direct_link(rule, &path, headers).await,
            ResolveMethod::Cookie | ResolveMethod::CookieOpen => {
                self.via_cookie(rule, &path, user_agent, headers).await
            }
            ResolveMethod::OpenApi => self.via_open_api(rule, &path, user_agent, headers).await,
        }
    }

    async fn via_direct_link(
        &self,
        rule: &PathRule,
        path: &str,
        headers: &HeaderMap,
    ) -> Resolution {
        let link_path = rule.to_direct_link(path);
        match self
            .direct_link
            .resolve_path(&link_path, headers.clone())
            .await
        {
            Ok(url) => {
                info!(path = %link_path, "resolved via direct link");
                Resolution::Redirect(url)
            }
            Err(err) => {
                warn!(path = %link_path, error = %err, "direct-link resolution failed");
                Resolution::PassThrough
            }
        }
    }

    async fn via_cookie(
        &self,
        rule: &PathRule,
        path: &str,
        user_agent: &str,
        headers: &HeaderMap,
    ) -> Resolution {
        let Some(driver) = &self.driver else {
            warn!("cookie method configured without a drive client");
            return self.via_direct_link(rule, path, headers).await;
        };
        let cloud_path = rule.to_cloud(path);

        let pickcode = match self.find_pickcode(driver, &cloud_path).await {
            Some(pickcode) => pickcode,
            None => {
                info!(path = %cloud_path, "no pickcode found, degrading to direct link");
                return self.via_direct_link(rule, path, headers).await;
            }
        };

        match driver.download_url(&pickcode, user_agent).await {
            Ok(url) => {
                info!(path = %cloud_path, "resolved via cookie driver");
                return Resolution::Redirect(url);
            }
            Err(err) => {
                warn!(path = %cloud_path, error = %err, "cookie driver failed, trying open api");
            }
        }

        match self.open_download_url(&pickcode, user_agent).await {
            Some(url) => {
                info!(path = %cloud_path, "resolved via open api");
                Resolution::Redirect(url)
            }
            None => self.via_direct_link(rule, path, headers).await,
        }
    }

    async fn via_open_api(
        &self,
        rule: &PathRule,
        path: &str,
        user_agent: &str,
        headers: &HeaderMap,
    ) -> Resolution {
        let cloud_path = rule.to_cloud(path);
        let Some(open_api) = &self.open_api else {
            warn!("open-api method configured without an open-api client");
            return self.via_direct_link(rule, path, headers).await;
        };
        let pickcode = match open_api.pickcode_by_path(&cloud_path).await {
            Ok(pickcode) => pickcode,
            Err(err) => {
                warn!(path = %cloud_path, error = %err, "open-api pickcode lookup failed");
                return self.via_direct_link(rule, path, headers).await;
            }
        };
        match self.open_download_url(&pickcode, user_agent).await {
            Some(url) => {
                info!(path = %cloud_path, "resolved via open api");
                Resolution::Redirect(url)
            }
            None => self.via_direct_link(rule, path, headers).await,
        }
    }

    async fn open_download_url(&self, pickcode: &str, user_agent: &str) -> Option<String> {
        let open_api = self.open_api.as_ref()?;
        match open_api.download_url(pickcode, user_agent).await {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(pickcode, error = %err, "open-api download url failed");
                None
            }
        }
    }

    /// Pickcode for a cloud path: durable cache first, then a directory
    /// listing through the cookie driver. A listing hit populates the
    /// cache for the file and, in the background, for its siblings.
    async fn find_pickcode(&self, driver: &CookieDriveClient, cloud_path: &str) -> Option<String> {
        if self.cache_pickcodes {
            match self.store.get_pickcode(cloud_path).await {
                Ok(Some(pickcode)) if !pickcode.is_empty() => {
                    debug!(path = %cloud_path, "pickcode cache hit");
                    return Some(pickcode);
                }
                Ok(_) => {}
                Err(err) => warn!(path = %cloud_path, error = %err, "pickcode cache read failed"),
            }
        }

        let (dir_path, file_name) = split_path(cloud_path);
        let dir_id = match driver.dir_id(dir_path).await {
            Ok(id) => id,
            Err(err) => {
                warn!(dir = %dir_path, error = %err, "directory id lookup failed");
                return None;
            }
        };
        let files = match driver.list_dir(&dir_id).await {
            Ok(files) => files,
            Err(err) => {
                warn!(dir = %dir_path, error = %err, "directory listing failed");
                return None;
            }
        };

        // Exact, case-sensitive match against the listing.
        let pickcode = files
            .iter()
            .find(|f| f.name == file_name)
            .map(|f| f.pickcode.clone())
            .filter(|pc| !pc.is_empty());

        if self.cache_pickcodes {
            if let Some(pickcode) = &pickcode {
                if let Err(err) = self.store.save_pickcode(cloud_path, pickcode).await {
                    warn!(path = %cloud_path, error = %err, "pickcode cache write failed");
                }
            }
            self.cache_siblings(dir_path.to_string(), files);
        }

        pickcode
    }

    /// Opportunistically cache every sibling's pickcode, off the request
    /// path and skipping entries that are already present.
    fn cache_siblings(&self, dir_path: String, files: Vec<DriveFile>) {
        let store = Arc::clone(&self.store);
        self.pool.spawn(async move {
            let mut cached = 0usize;
            let mut skipped = 0usize;
            for file in files {
                if file.pickcode.is_empty() {
                    continue;
                }
                let full_path = join_path(&dir_path, &file.name);
                match store.get_pickcode(&full_path).await {
                    Ok(Some(_)) => {
                        skipped += 1;
                        continue;
                    }
                    Ok(None) => {}
                    Err(_) => continue,
                }
                match store.save_pickcode(&full_path, &file.pickcode).await {
                    Ok(()) => cached += 1,
                    Err(err) => warn!(path = %full_path, error = %err, "sibling cache failed"),
                }
            }
            debug!(cached, skipped, dir = %dir_path, "sibling pickcodes cached");
        });
    }
}

fn split_path(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some(("", name)) => ("/", name),
        Some((dir, name)) => (dir, name),
        None => ("/", path),
    }
}

fn join_path(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_path_handles_root_and_nested() {
        assert_eq!(split_path("/movie.mkv"), ("/", "movie.mkv"));
        assert_eq!(split_path("/a/b/movie.mkv"), ("/a/b", "movie.mkv"));
    }

    #[test]
    fn join_path_avoids_double_slash() {
        assert_eq!(join_path("/", "m.mkv"), "/m.mkv");
        assert_eq!(join_path("/a/b", "m.mkv"), "/a/b/m.mkv");
    }
}
