//! Request spacing, backoff and retry for Spotify Web API calls.
//!
//! A single [`RateLimiter`] is created per run and shared (behind an `Arc`) by
//! every fetcher. It is the only place that sleeps on behalf of the provider:
//!
//! - consecutive calls start at least [`RetryPolicy::min_interval`] apart,
//!   no matter which fetcher issues them
//! - a `429 Too Many Requests` waits for the `Retry-After` hint, or for an
//!   exponential backoff when the hint is missing
//! - transient failures (timeouts, connection errors, 5xx) use the same
//!   backoff schedule and the same attempt budget
//! - anything else is returned to the caller untouched after one attempt
//!
//! The last-call timestamp sits behind an async mutex that is held while
//! waiting out the interval, so concurrent callers are serialized.

use std::{future::Future, time::Duration};

use tokio::{
    sync::Mutex,
    time::{Instant, sleep},
};

use crate::{
    config::RetryPolicy,
    error::{CollectError, Result},
    utils, warning,
};

/// How a single attempt failed, as seen by the retry loop.
#[derive(Debug)]
pub enum CallFailure {
    /// HTTP 429, with the provider's `Retry-After` hint when present.
    Throttled { retry_after: Option<Duration> },
    /// Timeouts, dropped connections and server errors.
    Transient(String),
    /// Not worth retrying; surfaced as is.
    Fatal(CollectError),
}

impl From<CollectError> for CallFailure {
    fn from(err: CollectError) -> Self {
        CallFailure::Fatal(err)
    }
}

pub struct RateLimiter {
    policy: RetryPolicy,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            last_call: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Suspends until the minimum interval since the previous call has passed,
    /// then records the start of a new call.
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let ready_at = last + self.policy.min_interval;
            if Instant::now() < ready_at {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }

    /// Runs `call` under the spacing and retry policy.
    ///
    /// `call` is invoked at most `max_retries + 1` times. When every attempt
    /// fails with a retryable failure the result is
    /// [`CollectError::RateLimitExceeded`].
    pub async fn execute<T, F, Fut>(&self, label: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, CallFailure>>,
    {
        let max_attempts = self.policy.max_retries + 1;
        let mut attempt: u32 = 0;

        loop {
            self.acquire().await;
            attempt += 1;

            let (hint, reason) = match call().await {
                Ok(value) => return Ok(value),
                Err(CallFailure::Fatal(err)) => return Err(err),
                Err(CallFailure::Throttled { retry_after }) => {
                    (retry_after, "rate limited (429)".to_string())
                }
                Err(CallFailure::Transient(reason)) => (None, reason),
            };

            if attempt >= max_attempts {
                return Err(CollectError::RateLimitExceeded {
                    attempts: attempt,
                    reason,
                });
            }

            let delay = match hint {
                Some(retry_after) if retry_after > self.policy.max_retry_after => {
                    warning!(
                        "{}: Spotify asked to wait {}s, giving up on this call.",
                        label,
                        retry_after.as_secs()
                    );
                    return Err(CollectError::RateLimitExceeded {
                        attempts: attempt,
                        reason: format!("retry-after of {}s is too long", retry_after.as_secs()),
                    });
                }
                Some(retry_after) => retry_after,
                None => utils::backoff_delay(
                    self.policy.base_delay,
                    attempt - 1,
                    self.policy.max_delay,
                ),
            };

            warning!(
                "{}: {}, retrying in {:?} ({}/{})",
                label,
                reason,
                delay,
                attempt,
                self.policy.max_retries
            );
            sleep(delay).await;
        }
    }
}
