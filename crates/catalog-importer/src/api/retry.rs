//! Retry policy for rate-limited catalog requests.
//!
//! Only HTTP 429 is retried. Every other failure is returned to the caller
//! after the first attempt.

use crate::error::RemoteError;
use rand::Rng;
use shared::config::{BackoffKind, RetryConfig};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::warn;

/// How often and how long to wait when the catalog answers 429
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `None` retries forever
    pub max_retries: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Limit for each individual attempt
    pub per_call_timeout: Option<Duration>,
    pub backoff: BackoffKind,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms.max(config.base_delay_ms)),
            per_call_timeout: config.per_call_timeout_ms.map(Duration::from_millis),
            backoff: config.backoff,
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// Wait two seconds and retry, without limit
    ///
    /// Under sustained throttling this never returns.
    pub fn legacy() -> Self {
        Self::from(&RetryConfig::legacy())
    }

    /// Delay before retry number `retry` (0-based), before jitter
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            BackoffKind::Fixed => self.base_delay,
            BackoffKind::Exponential => {
                let factor = 2u32.saturating_pow(retry);
                self.base_delay
                    .checked_mul(factor)
                    .unwrap_or(self.max_delay)
                    .min(self.max_delay)
            }
        }
    }

    fn next_delay(&self, retry: u32) -> Duration {
        let delay = self.delay_for(retry);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let millis = delay.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(0..=millis))
    }

    /// Run `op`, retrying it while it fails with [`RemoteError::RateLimited`]
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        self.run_after(|| async {}, op).await
    }

    /// Like [`RetryPolicy::run`], awaiting `ready` before every attempt.
    ///
    /// Time spent in `ready` (e.g. queued in a request limiter) does not count
    /// against the per-call timeout.
    pub async fn run_after<T, R, RFut, F, Fut>(&self, mut ready: R, mut op: F) -> Result<T, RemoteError>
    where
        R: FnMut() -> RFut,
        RFut: Future<Output = ()>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut retries = 0u32;

        loop {
            ready().await;

            let outcome = match self.per_call_timeout {
                Some(limit) => match timeout(limit, op()).await {
                    Ok(result) => result,
                    Err(_) => Err(RemoteError::Timeout {
                        timeout_ms: limit.as_millis() as u64,
                    }),
                },
                None => op().await,
            };

            match outcome {
                Err(e) if e.is_rate_limited() => {
                    if self.max_retries.is_some_and(|max| retries >= max) {
                        warn!(attempts = retries + 1, error = %e, "Giving up on rate-limited request");
                        return Err(RemoteError::RateLimitExhausted {
                            attempts: retries + 1,
                        });
                    }

                    let delay = self.next_delay(retries);
                    warn!(
                        error = %e,
                        retry = retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited by server, waiting"
                    );
                    sleep(delay).await;
                    retries += 1;
                }
                other => return other,
            }
        }
    }
}
