//! Error types for the catalog importer.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single call to the catalog API
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    /// HTTP 429; consumed by the retry policy
    #[error("request to {url} was rate limited")]
    RateLimited { url: String },

    #[error("still rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("attempt timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The envelope reported `ok: false`
    #[error("catalog API error: {message}")]
    Api { message: String },

    #[error("envelope from {url} has no data")]
    MissingData { url: String },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RemoteError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RemoteError::RateLimited { .. })
    }
}

/// Failure that aborts a whole import run
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to fetch anime list: {0}")]
    CatalogList(#[source] RemoteError),
}
