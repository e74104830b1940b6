//! Retry with exponential backoff for portal exchanges.
//!
//! Tokens issued by a probe are good for one postback only, so a failed
//! request is never resent as-is. [`send_text`] makes exactly one attempt,
//! and [`with_backoff`] reruns a whole operation (new session, new probe,
//! new postback) after a transient transport fault.
//!
//! A non-success HTTP status is returned immediately as
//! [`FetchError::HttpStatus`] and is never retried: the portal answered.
//!
//! ```ignore
//! let body = retry::with_backoff(&policy, period, || async {
//!     let html = retry::send_text(client.get(&url)).await?;
//!     // ...
//! })
//! .await?;
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::{FetchError, ScrapeConfig};

/// How many times, and how patiently, to retry an operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each subsequent one.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

impl From<&ScrapeConfig> for RetryPolicy {
    fn from(config: &ScrapeConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-transient error,
/// or `policy.max_retries` retries are used up.
///
/// `operation` is called afresh for every attempt, so whatever state it
/// builds (HTTP session, tokens) is never reused after a failure.
///
/// # Errors
///
/// Returns the last error produced by `operation`.
#[allow(clippy::future_not_send)]
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: impl Display,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "{label}: {e}; retry {attempt}/{} in {delay:?}...",
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Sends `request` once and returns the body text.
///
/// # Errors
///
/// Returns [`FetchError::HttpStatus`] for any non-2xx status, and
/// [`FetchError::Network`] when the transport or body read fails.
#[allow(clippy::future_not_send)]
pub async fn send_text(request: reqwest::RequestBuilder) -> Result<String, FetchError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        log::debug!("{} answered HTTP {status}", response.url());
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    Ok(response.text().await?)
}
