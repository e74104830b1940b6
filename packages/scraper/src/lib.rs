#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Stateful scrape-and-extract engine for the PIB press release portal.
//!
//! The portal is an ASP.NET Web Forms page: every search is a postback
//! that must replay the hidden view-state tokens issued by a preceding
//! page load on the same session. For each requested
//! [`Period`](pib_press_models::Period) the engine:
//!
//! 1. probes the search page for fresh tokens ([`token`]),
//! 2. builds the "change selection" postback form ([`postback`]),
//! 3. submits it on the same session ([`fetch`]),
//! 4. parses release links out of the response ([`extract`]).
//!
//! [`scheduler::PeriodScheduler`] runs one such pipeline per period
//! concurrently and merges the results, keeping per-period failures as
//! data instead of aborting the batch.

pub mod extract;
pub mod fetch;
pub mod postback;
pub mod progress;
pub mod retry;
pub mod scheduler;
pub mod token;

use std::time::Duration;

use strum_macros::{Display, IntoStaticStr};

pub use extract::{Listing, ReleaseExtractor};
pub use fetch::{FetchOutcome, Fetcher};
pub use scheduler::{MergedResult, PeriodFailure, PeriodScheduler, PeriodSummary};

/// Origin of the live portal.
pub const DEFAULT_ORIGIN: &str = "https://www.pib.gov.in";

/// Path and query of the "all releases" search page, relative to the origin.
pub const SEARCH_PATH: &str = "/allRel.aspx?reg=3&lang=1";

/// The portal degrades or rejects requests from non-browser agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// One of the hidden inputs a postback must replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum TokenField {
    /// `__VIEWSTATE`
    #[strum(serialize = "__VIEWSTATE")]
    ViewState,
    /// `__VIEWSTATEGENERATOR`
    #[strum(serialize = "__VIEWSTATEGENERATOR")]
    ViewStateGenerator,
    /// `__EVENTVALIDATION`
    #[strum(serialize = "__EVENTVALIDATION")]
    EventValidation,
}

impl TokenField {
    /// Every token field, in the order they are looked up.
    pub const ALL: [Self; 3] = [
        Self::ViewState,
        Self::ViewStateGenerator,
        Self::EventValidation,
    ];

    /// The element id (and form field name) of this token.
    #[must_use]
    pub fn id(self) -> &'static str {
        self.into()
    }
}

/// Reasons token extraction can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// A hidden input was absent (or had no `value`). Usually means the
    /// page layout changed or the probe landed on an error page.
    #[error("hidden field {0} not found in search page")]
    MissingToken(TokenField),
}

/// Why a single period could not be fetched.
///
/// Failures are carried as data inside [`MergedResult`], so this type is
/// `Clone` and owns only plain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The probe response did not contain usable session tokens.
    #[error("token probe failed: {0}")]
    ProbeFailed(#[from] TokenError),

    /// The probe or the postback answered with a non-success status.
    #[error("server returned HTTP {0}")]
    HttpStatus(u16),

    /// Transport-level fault (DNS, connect, TLS, reset, request timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The caller-imposed deadline for this period expired.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The per-period HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl FetchError {
    /// Returns `true` for transport faults that a fresh exchange may get
    /// past. The portal's own answers (status codes, missing tokens) and
    /// period deadlines are final.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Self::HttpStatus(status.as_u16());
        }
        if e.is_builder() {
            return Self::Client(e.to_string());
        }

        // reqwest's top-level message is terse; the cause chain carries
        // the useful part (e.g. "connection refused", certificate errors).
        let mut detail = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }

        Self::Network(detail)
    }
}

/// Engine configuration.
///
/// Defaults target the live portal. None of this is read from the
/// environment; callers construct it explicitly.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Full URL of the search page (probe and postback target).
    pub endpoint_url: String,
    /// Scheme + host used for the `Origin` header and to absolutize links.
    pub origin: String,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Maximum number of periods in flight at once.
    pub max_concurrency: usize,
    /// Deadline for one period's probe + postback exchange.
    pub period_timeout: Duration,
    /// Optional deadline for the whole batch.
    pub batch_timeout: Option<Duration>,
    /// Transport timeout for each individual HTTP request.
    pub request_timeout: Duration,
    /// Retries for transient transport errors, per request.
    pub max_retries: u32,
    /// Backoff before the first retry; doubled on each further attempt.
    pub retry_base_delay: Duration,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self::for_origin(DEFAULT_ORIGIN)
    }
}

impl ScrapeConfig {
    /// Creates a configuration for the live portal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration for a portal served from `origin`
    /// (e.g. `http://127.0.0.1:8080`). The search path is appended.
    #[must_use]
    pub fn for_origin(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            endpoint_url: format!("{origin}{SEARCH_PATH}"),
            origin: origin.to_owned(),
            user_agent: BROWSER_USER_AGENT.to_owned(),
            max_concurrency: 4,
            period_timeout: Duration::from_secs(60),
            batch_timeout: None,
            request_timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_base_delay: Duration::from_secs(1),
        }
    }

    /// Sets the maximum number of periods fetched concurrently.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Sets the per-period deadline.
    #[must_use]
    pub const fn with_period_timeout(mut self, timeout: Duration) -> Self {
        self.period_timeout = timeout;
        self
    }

    /// Sets a deadline for the whole batch.
    #[must_use]
    pub const fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }

    /// Sets the transport timeout for each HTTP request.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the number of retries for transient transport errors.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the initial retry backoff.
    #[must_use]
    pub const fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Overrides the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        user_agent.clone_into(&mut self.user_agent);
        self
    }
}
