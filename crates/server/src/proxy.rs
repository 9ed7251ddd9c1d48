//! Pass-through reverse proxy to the media server.

use crate::error::{ApiError, ApiResult};
use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use axum::response::Response;
use tracing::debug;

/// Request bodies are buffered before forwarding; playback traffic is
/// GET-heavy and control bodies are small JSON.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub struct ProxyClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Forward a request to the media server, preserving method, headers,
    /// body and status, and stream the response back.
    pub async fn forward(&self, req: Request) -> ApiResult<Response> {
        let (parts, body) = req.into_parts();
        let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read request body: {e}")))?;
        self.forward_parts(parts, body).await
    }

    /// Same as [`forward`], for a request whose body was already read.
    pub async fn forward_parts(
        &self,
        parts: axum::http::request::Parts,
        body: axum::body::Bytes,
    ) -> ApiResult<Response> {
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("{}{}", self.base_url, path_and_query);

        let mut headers = parts.headers;
        headers.remove(HOST);
        headers.remove(CONTENT_LENGTH);

        debug!(method = %parts.method, %url, "proxying to media server");
        let upstream = self
            .http
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(e.to_string()))?;

        let mut builder = Response::builder().status(upstream.status());
        for (name, value) in upstream.headers() {
            if name == TRANSFER_ENCODING || name == CONNECTION {
                continue;
            }
            builder = builder.header(name, value);
        }
        builder
            .body(Body::from_stream(upstream.bytes_stream()))
            .map_err(|e| ApiError::Internal(e.to_string()))
    }
}
