//! Samehadaku catalog API client with request limiting and 429 retry.

use super::rate_limiter::RateLimiter;
use super::retry::RetryPolicy;
use super::types::*;
use super::CatalogSource;
use crate::error::RemoteError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::config::CatalogConfig;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Client for the samehadaku catalog endpoints
pub struct SamehadakuClient {
    /// HTTP client
    client: Client,
    /// Base URL, without trailing slash
    base_url: String,
    /// Shared by every request to the catalog host
    rate_limiter: Mutex<RateLimiter>,
    /// Policy for HTTP 429 responses
    retry: RetryPolicy,
}

impl SamehadakuClient {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        rate_limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("anime-catalog-importer/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rate_limiter: Mutex::new(rate_limiter),
            retry,
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
            RateLimiter::new(
                config.rate_limit.requests_per_second,
                config.rate_limit.requests_per_minute,
            ),
            RetryPolicy::from(&config.retry),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET an endpoint and unwrap its envelope, retrying on 429
    ///
    /// Every attempt first waits for a limiter slot; only the HTTP exchange
    /// itself is subject to the per-call timeout.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        let limiter = &self.rate_limiter;
        self.retry
            .run_after(
                move || async move { limiter.lock().await.acquire().await },
                || self.get_once(&url),
            )
            .await
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, RemoteError> {
        debug!(url = %url, "Making API request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| RemoteError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RemoteError::RateLimited {
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| RemoteError::Transport {
                url: url.to_string(),
                source,
            })?;

        // Failures are reported inside the envelope, often alongside a non-2xx status
        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(envelope) if !envelope.ok => Err(RemoteError::Api {
                message: envelope
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            }),
            Ok(envelope) => envelope.data.ok_or_else(|| RemoteError::MissingData {
                url: url.to_string(),
            }),
            Err(_) if !status.is_success() => Err(RemoteError::Status {
                url: url.to_string(),
                status,
            }),
            Err(source) => Err(RemoteError::Decode {
                url: url.to_string(),
                source,
            }),
        }
    }
}

#[async_trait]
impl CatalogSource for SamehadakuClient {
    async fn fetch_anime_list(&self) -> Result<Vec<AnimeSummary>, RemoteError> {
        info!("Fetching anime list from home page");
        let home: HomeData = self.get("/samehadaku/home").await?;
        Ok(home.recent.map(|r| r.anime_list).unwrap_or_default())
    }

    async fn fetch_anime_detail(&self, anime_id: &str) -> Result<AnimeDetail, RemoteError> {
        debug!(anime_id = anime_id, "Fetching anime details");
        self.get(&format!("/samehadaku/anime/{}", anime_id)).await
    }

    async fn fetch_episode_detail(&self, episode_id: &str) -> Result<EpisodeDetail, RemoteError> {
        debug!(episode_id = episode_id, "Fetching episode details");
        self.get(&format!("/samehadaku/episode/{}", episode_id)).await
    }

    async fn fetch_server_url(&self, server_id: &str) -> Option<String> {
        debug!(server_id = server_id, "Fetching server URL");
        match self
            .get::<ServerDetail>(&format!("/samehadaku/server/{}", server_id))
            .await
        {
            Ok(detail) => detail.url.filter(|url| !url.trim().is_empty()),
            Err(e) => {
                warn!(server_id = server_id, error = %e, "Failed to resolve server URL");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::config::{BackoffKind, Config};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response per connection, in order
    async fn serve(responses: Vec<(u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;

                let reason = match status {
                    200 => "OK",
                    404 => "Not Found",
                    429 => "Too Many Requests",
                    _ => "Internal Server Error",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });

        format!("http://{}", addr)
    }

    fn client(base_url: String) -> SamehadakuClient {
        let retry = RetryPolicy {
            max_retries: Some(3),
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            per_call_timeout: Some(Duration::from_secs(5)),
            backoff: BackoffKind::Fixed,
            jitter: false,
        };
        SamehadakuClient::new(base_url, Duration::from_secs(5), RateLimiter::unlimited(), retry)
            .unwrap()
    }

    #[test]
    fn test_client_from_default_config() {
        let config = Config::default();
        let client = SamehadakuClient::from_config(&config.catalog).unwrap();
        assert_eq!(client.base_url(), "https://animeh.lopyubibil.site");
    }

    #[tokio::test]
    async fn test_anime_list_after_rate_limits() {
        let base = serve(vec![
            (429, "{}"),
            (429, "{}"),
            (
                200,
                r#"{"ok":true,"data":{"recent":{"animeList":[{"title":"Dandadan","animeId":"dandadan"}]}}}"#,
            ),
        ])
        .await;

        let list = client(base).fetch_anime_list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].anime_id, "dandadan");
    }

    #[tokio::test]
    async fn test_not_ok_envelope_is_api_error() {
        let base = serve(vec![(404, r#"{"ok":false,"message":"Anime not found"}"#)]).await;

        let err = client(base).fetch_anime_detail("missing").await.unwrap_err();
        match err {
            RemoteError::Api { message } => assert_eq!(message, "Anime not found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_page_is_status_error() {
        let base = serve(vec![(500, "<html>oops</html>")]).await;

        let err = client(base).fetch_episode_detail("ep-1").await.unwrap_err();
        assert!(matches!(err, RemoteError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_missing_home_list_is_empty() {
        let base = serve(vec![(200, r#"{"ok":true,"data":{}}"#)]).await;

        let list = client(base).fetch_anime_list().await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_server_url_failures_resolve_to_none() {
        let base = serve(vec![
            (200, r#"{"ok":true,"data":{"url":"https://video/embed/1"}}"#),
            (200, r#"{"ok":true,"data":{"url":""}}"#),
            (404, r#"{"ok":false,"message":"Server not found"}"#),
        ])
        .await;
        let client = client(base);

        assert_eq!(
            client.fetch_server_url("s1").await.as_deref(),
            Some("https://video/embed/1")
        );
        assert_eq!(client.fetch_server_url("s2").await, None);
        assert_eq!(client.fetch_server_url("s3").await, None);
    }
}
