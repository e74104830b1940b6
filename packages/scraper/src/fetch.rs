//! Probe-then-postback exchange for a single period.
//!
//! Every call to [`Fetcher::fetch`] builds its own [`reqwest::Client`] with
//! its own cookie store. The portal ties a postback's validity to the
//! session that issued its tokens, so sessions are never shared between
//! periods, and a retried exchange starts over on a new session with a
//! new probe.

use pib_press_models::Period;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};
use tokio::time::Instant;

use crate::retry::{self, RetryPolicy};
use crate::scheduler::PeriodFailure;
use crate::{FetchError, ScrapeConfig, postback, token};

/// Result of one period's exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The postback succeeded; `body` is the raw listing page.
    Success {
        /// The period that was fetched.
        period: Period,
        /// Response HTML.
        body: String,
    },
    /// Some step failed.
    Failure(PeriodFailure),
}

/// Runs the two-step exchange against the portal.
#[derive(Debug, Clone)]
pub struct Fetcher {
    config: ScrapeConfig,
}

impl Fetcher {
    /// Creates a fetcher for the portal described by `config`.
    #[must_use]
    pub const fn new(config: ScrapeConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration this fetcher uses.
    #[must_use]
    pub const fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    /// Fetches `period`, bounded by the configured period timeout.
    pub async fn fetch(&self, period: Period) -> FetchOutcome {
        self.fetch_before(period, None).await
    }

    /// Fetches `period`, bounded by the configured period timeout and, if
    /// given, an earlier batch deadline.
    ///
    /// Never fails outright: every error comes back as
    /// [`FetchOutcome::Failure`].
    pub async fn fetch_before(
        &self,
        period: Period,
        batch_deadline: Option<Instant>,
    ) -> FetchOutcome {
        let started = Instant::now();
        let mut deadline = started + self.config.period_timeout;
        if let Some(batch_deadline) = batch_deadline {
            deadline = deadline.min(batch_deadline);
        }

        let policy = RetryPolicy::from(&self.config);
        let attempts = retry::with_backoff(&policy, period, || self.exchange(period));

        let result = tokio::time::timeout_at(deadline, attempts)
            .await
            .unwrap_or_else(|_| Err(FetchError::Timeout(started.elapsed())));

        match result {
            Ok(body) => {
                log::debug!("{period}: postback returned {} bytes", body.len());
                FetchOutcome::Success { period, body }
            }
            Err(reason) => {
                log::warn!("{period}: {reason}");
                FetchOutcome::Failure(PeriodFailure { period, reason })
            }
        }
    }

    /// Probe, build, post, all on one fresh session. The postback is sent
    /// at most once per probe.
    async fn exchange(&self, period: Period) -> Result<String, FetchError> {
        let client = session_client(&self.config)?;

        let tokens = token::probe(&client, &self.config).await?;
        let payload = postback::build(period, tokens);

        log::debug!("{period}: submitting postback to {}", self.config.endpoint_url);

        retry::send_text(
            client
                .post(&self.config.endpoint_url)
                .form(payload.fields()),
        )
        .await
    }
}

/// Builds a client for one period's session.
///
/// Certificate verification is off: the portal's chain is known to be
/// broken. Cookies are kept so the postback rides the probe's session.
fn session_client(config: &ScrapeConfig) -> Result<reqwest::Client, FetchError> {
    let header = |value: &str| {
        HeaderValue::from_str(value)
            .map_err(|e| FetchError::Client(format!("invalid header value '{value}': {e}")))
    };

    let mut headers = HeaderMap::new();
    headers.insert(ORIGIN, header(&config.origin)?);
    headers.insert(REFERER, header(&config.endpoint_url)?);

    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .cookie_store(true)
        .danger_accept_invalid_certs(true)
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| FetchError::Client(e.to_string()))
}
