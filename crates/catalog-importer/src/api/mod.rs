//! Samehadaku catalog API access.
//!
//! [`CatalogSource`] is the seam the importer talks to; [`SamehadakuClient`]
//! implements it over HTTP with request limiting and 429 retry.

pub mod client;
pub mod rate_limiter;
pub mod retry;
pub mod types;

pub use client::SamehadakuClient;
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
pub use types::*;

use crate::error::RemoteError;
use async_trait::async_trait;

/// Read access to a remote anime catalog
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Recently released anime, in the order the catalog lists them
    async fn fetch_anime_list(&self) -> Result<Vec<AnimeSummary>, RemoteError>;

    async fn fetch_anime_detail(&self, anime_id: &str) -> Result<AnimeDetail, RemoteError>;

    async fn fetch_episode_detail(&self, episode_id: &str) -> Result<EpisodeDetail, RemoteError>;

    /// Playable URL of a streaming server, `None` when it cannot be resolved
    async fn fetch_server_url(&self, server_id: &str) -> Option<String>;
}
