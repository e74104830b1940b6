//! Concurrent fan-out over the requested periods.
//!
//! Each period runs its own fetch + extract pipeline. At most
//! `min(max_concurrency, periods)` pipelines are in flight, and results
//! are merged in completion order. A failed period is recorded next to
//! the records of the ones that succeeded; it never aborts the batch.

use std::sync::Arc;

use futures::stream::{self, StreamExt as _};
use pib_press_models::{KeywordFilter, Period, ReleaseRecord, ScrapeRequest};
use tokio::time::Instant;

use crate::progress::{ProgressCallback, null_progress};
use crate::{FetchError, FetchOutcome, Fetcher, ReleaseExtractor, ScrapeConfig};

/// A period that produced no records because something went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodFailure {
    /// The period that failed.
    pub period: Period,
    /// Why it failed.
    pub reason: FetchError,
}

/// A period whose listing was fetched and parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodSummary {
    /// The period.
    pub period: Period,
    /// Records kept after filtering. Zero means "no matching releases".
    pub record_count: usize,
    /// The portal's result-count banner, if it showed one.
    pub server_message: Option<String>,
}

/// Combined output of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedResult {
    /// All records, grouped by period in completion order.
    pub records: Vec<ReleaseRecord>,
    /// Periods that failed, in completion order.
    pub failures: Vec<PeriodFailure>,
    /// Periods that succeeded, in completion order.
    pub summaries: Vec<PeriodSummary>,
}

impl MergedResult {
    /// Every requested period failed.
    #[must_use]
    pub fn is_total_failure(&self) -> bool {
        self.summaries.is_empty() && !self.failures.is_empty()
    }

    /// Some periods succeeded and some failed.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.summaries.is_empty() && !self.failures.is_empty()
    }

    /// Periods that were fetched successfully but had no matching releases.
    pub fn empty_periods(&self) -> impl Iterator<Item = Period> + '_ {
        self.summaries
            .iter()
            .filter(|summary| summary.record_count == 0)
            .map(|summary| summary.period)
    }

    fn push(&mut self, outcome: PeriodResult) {
        match outcome {
            PeriodResult::Completed { summary, records } => {
                self.records.extend(records);
                self.summaries.push(summary);
            }
            PeriodResult::Failed(failure) => self.failures.push(failure),
        }
    }
}

/// What one pipeline hands back to the merge step.
enum PeriodResult {
    Completed {
        summary: PeriodSummary,
        records: Vec<ReleaseRecord>,
    },
    Failed(PeriodFailure),
}

/// Runs one fetch + extract pipeline per requested period.
#[derive(Debug, Clone)]
pub struct PeriodScheduler {
    fetcher: Fetcher,
    extractor: ReleaseExtractor,
}

impl PeriodScheduler {
    /// Creates a scheduler for the portal described by `config`.
    #[must_use]
    pub fn new(config: ScrapeConfig) -> Self {
        let extractor = ReleaseExtractor::new(&config.origin);
        Self {
            fetcher: Fetcher::new(config),
            extractor,
        }
    }

    /// Scrapes every period in `request` and merges the results.
    pub async fn run(&self, request: &ScrapeRequest) -> MergedResult {
        self.run_with_progress(request, &null_progress()).await
    }

    /// Like [`run`](Self::run), reporting each finished period to
    /// `progress`.
    pub async fn run_with_progress(
        &self,
        request: &ScrapeRequest,
        progress: &Arc<dyn ProgressCallback>,
    ) -> MergedResult {
        let config = self.fetcher.config();
        let periods = request.periods();
        let concurrency = config.max_concurrency.clamp(1, periods.len().max(1));
        let batch_deadline = config.batch_timeout.map(|timeout| Instant::now() + timeout);
        let filter = request.filter();

        log::info!(
            "Scraping {} period(s) from {} (concurrency={concurrency}, keyword={:?})",
            periods.len(),
            config.endpoint_url,
            filter.term(),
        );

        progress.set_total(periods.len() as u64);

        let mut pending = stream::iter(
            periods
                .iter()
                .map(|&period| self.run_period(period, filter, batch_deadline)),
        )
        .buffer_unordered(concurrency);

        let mut merged = MergedResult::default();
        while let Some(outcome) = pending.next().await {
            if let PeriodResult::Completed { summary, .. } = &outcome {
                progress.set_message(format!(
                    "{}: {} release(s)",
                    summary.period, summary.record_count
                ));
            }
            merged.push(outcome);
            progress.inc(1);
        }

        let message = format!(
            "{} record(s), {} failed period(s)",
            merged.records.len(),
            merged.failures.len()
        );
        log::info!("Scrape complete: {message}");
        progress.finish(message);

        merged
    }

    async fn run_period(
        &self,
        period: Period,
        filter: &KeywordFilter,
        batch_deadline: Option<Instant>,
    ) -> PeriodResult {
        match self.fetcher.fetch_before(period, batch_deadline).await {
            FetchOutcome::Success { period, body } => {
                let listing = self.extractor.extract_listing(&body, period, filter);

                if let Some(message) = &listing.server_message {
                    log::info!("{period}: server says \"{message}\"");
                }
                log::info!("{period}: {} matching release(s)", listing.records.len());

                PeriodResult::Completed {
                    summary: PeriodSummary {
                        period,
                        record_count: listing.records.len(),
                        server_message: listing.server_message,
                    },
                    records: listing.records,
                }
            }
            FetchOutcome::Failure(failure) => PeriodResult::Failed(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::token::tests::SEARCH_PAGE;

    fn listing(titles: &[&str]) -> String {
        let links: String = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                format!(r#"<li><a href="/PressReleasePage.aspx?PRID={i}" title="{title}">x</a></li>"#)
            })
            .collect();
        format!(r#"<html><body><div class="content-area"><ul>{links}</ul></div></body></html>"#)
    }

    async fn portal() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/allRel.aspx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_PAGE))
            .mount(&server)
            .await;
        server
    }

    async fn mount_month(server: &MockServer, month: u32, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/allRel.aspx"))
            .and(body_string_contains(format!("ddlMonth={month}&").as_str()))
            .respond_with(response)
            .mount(server)
            .await;
    }

    fn scheduler_for(server: &MockServer) -> PeriodScheduler {
        PeriodScheduler::new(ScrapeConfig::for_origin(&server.uri()).with_max_retries(0))
    }

    fn months(year: i32, months: &[u32]) -> Vec<Period> {
        months
            .iter()
            .map(|&m| Period::whole_month(m, year).unwrap())
            .collect()
    }

    fn sorted_titles(result: &MergedResult) -> Vec<String> {
        let mut titles: Vec<String> = result.records.iter().map(|r| r.title.clone()).collect();
        titles.sort();
        titles
    }

    #[tokio::test]
    async fn single_day_labels_every_record() {
        let server = portal().await;
        mount_month(
            &server,
            12,
            ResponseTemplate::new(200).set_body_string(listing(&["Budget", "Census"])),
        )
        .await;

        let request = ScrapeRequest::new([Period::new(9, 12, 2024).unwrap()], "").unwrap();
        let result = scheduler_for(&server).run(&request).await;

        assert!(result.failures.is_empty());
        assert_eq!(result.records.len(), 2);
        assert!(result.records.iter().all(|r| r.period_label == "9-12-2024"));
        assert_eq!(result.summaries.len(), 1);
        assert_eq!(result.summaries[0].record_count, 2);
    }

    #[tokio::test]
    async fn keyword_applies_across_months() {
        let server = portal().await;
        mount_month(
            &server,
            1,
            ResponseTemplate::new(200)
                .set_body_string(listing(&["Finance Commission meets", "Railway budget"])),
        )
        .await;
        mount_month(
            &server,
            2,
            ResponseTemplate::new(200)
                .set_body_string(listing(&["Health update", "FINANCE ministry note"])),
        )
        .await;

        let request = ScrapeRequest::new(months(2024, &[1, 2]), "Finance").unwrap();
        let result = scheduler_for(&server).run(&request).await;

        assert!(result.failures.is_empty());
        let mut pairs: Vec<(String, String)> = result
            .records
            .iter()
            .map(|r| (r.period_label.clone(), r.title.clone()))
            .collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                (
                    "Month-1-2024".to_owned(),
                    "Finance Commission meets".to_owned()
                ),
                ("Month-2-2024".to_owned(), "FINANCE ministry note".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn one_failed_period_does_not_hide_the_others() {
        let server = portal().await;
        mount_month(
            &server,
            1,
            ResponseTemplate::new(200).set_body_string(listing(&["January release"])),
        )
        .await;
        mount_month(&server, 2, ResponseTemplate::new(500)).await;
        mount_month(
            &server,
            3,
            ResponseTemplate::new(200).set_body_string(listing(&["March release", "March two"])),
        )
        .await;

        let request = ScrapeRequest::new(months(2024, &[1, 2, 3]), "").unwrap();
        let result = scheduler_for(&server).run(&request).await;

        assert_eq!(
            result.failures,
            vec![PeriodFailure {
                period: Period::whole_month(2, 2024).unwrap(),
                reason: FetchError::HttpStatus(500),
            }]
        );
        assert_eq!(
            sorted_titles(&result),
            vec!["January release", "March release", "March two"]
        );
        assert!(result.is_partial());
        assert!(!result.is_total_failure());
    }

    #[tokio::test]
    async fn preserves_page_order_within_a_period() {
        let server = portal().await;
        mount_month(
            &server,
            5,
            ResponseTemplate::new(200).set_body_string(listing(&["Zeta", "Alpha", "Mu"])),
        )
        .await;

        let request = ScrapeRequest::new(months(2024, &[5]), "").unwrap();
        let result = scheduler_for(&server).run(&request).await;

        let titles: Vec<&str> = result.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Zeta", "Alpha", "Mu"]);
    }

    #[tokio::test]
    async fn empty_listing_is_not_a_failure() {
        let server = portal().await;
        mount_month(
            &server,
            6,
            ResponseTemplate::new(200).set_body_string(
                r#"<html><body><div class="search_box_result">No Record Found</div></body></html>"#,
            ),
        )
        .await;

        let request = ScrapeRequest::new(months(2024, &[6]), "").unwrap();
        let result = scheduler_for(&server).run(&request).await;

        assert!(result.records.is_empty());
        assert!(result.failures.is_empty());
        assert_eq!(
            result.empty_periods().collect::<Vec<_>>(),
            months(2024, &[6])
        );
        assert_eq!(
            result.summaries[0].server_message.as_deref(),
            Some("No Record Found")
        );
    }

    #[tokio::test]
    async fn every_period_failing_is_total_failure() {
        let server = portal().await;
        mount_month(&server, 7, ResponseTemplate::new(503)).await;
        mount_month(&server, 8, ResponseTemplate::new(503)).await;

        let request = ScrapeRequest::new(months(2024, &[7, 8]), "").unwrap();
        let result = scheduler_for(&server).run(&request).await;

        assert!(result.records.is_empty());
        assert_eq!(result.failures.len(), 2);
        assert!(result.is_total_failure());
    }

    #[tokio::test]
    async fn slow_period_times_out_without_blocking_siblings() {
        let server = portal().await;
        mount_month(
            &server,
            9,
            ResponseTemplate::new(200).set_delay(Duration::from_secs(10)),
        )
        .await;
        mount_month(
            &server,
            10,
            ResponseTemplate::new(200).set_body_string(listing(&["October release"])),
        )
        .await;

        let config = ScrapeConfig::for_origin(&server.uri())
            .with_max_retries(0)
            .with_period_timeout(Duration::from_millis(500));
        let request = ScrapeRequest::new(months(2024, &[9, 10]), "").unwrap();
        let result = PeriodScheduler::new(config).run(&request).await;

        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].period, Period::whole_month(9, 2024).unwrap());
        assert!(matches!(result.failures[0].reason, FetchError::Timeout(_)));
        assert_eq!(sorted_titles(&result), vec!["October release"]);
    }

    #[tokio::test]
    async fn batch_deadline_times_out_queued_periods() {
        let server = portal().await;
        for month in [1, 2] {
            mount_month(
                &server,
                month,
                ResponseTemplate::new(200).set_delay(Duration::from_secs(10)),
            )
            .await;
        }

        let config = ScrapeConfig::for_origin(&server.uri())
            .with_max_retries(0)
            .with_max_concurrency(1)
            .with_batch_timeout(Duration::from_millis(300));
        let request = ScrapeRequest::new(months(2024, &[1, 2]), "").unwrap();
        let result = PeriodScheduler::new(config).run(&request).await;

        assert_eq!(result.failures.len(), 2);
        assert!(
            result
                .failures
                .iter()
                .all(|f| matches!(f.reason, FetchError::Timeout(_)))
        );
    }

    #[tokio::test]
    async fn never_exceeds_max_concurrency() {
        let server = portal().await;
        for month in 1..=4 {
            mount_month(
                &server,
                month,
                ResponseTemplate::new(200)
                    .set_body_string(listing(&["release"]))
                    .set_delay(Duration::from_millis(300)),
            )
            .await;
        }

        let config = ScrapeConfig::for_origin(&server.uri())
            .with_max_retries(0)
            .with_max_concurrency(2);
        let request = ScrapeRequest::new(months(2024, &[1, 2, 3, 4]), "").unwrap();

        let started = Instant::now();
        let result = PeriodScheduler::new(config).run(&request).await;
        let elapsed = started.elapsed();

        assert_eq!(result.summaries.len(), 4);
        // Two waves of two postbacks each: never all four at once, never
        // one at a time.
        assert!(elapsed >= Duration::from_millis(600), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1200), "{elapsed:?}");
    }

    struct CountingProgress {
        total: AtomicU64,
        done: AtomicU64,
    }

    impl ProgressCallback for CountingProgress {
        fn set_total(&self, total: u64) {
            self.total.store(total, Ordering::SeqCst);
        }
        fn inc(&self, delta: u64) {
            self.done.fetch_add(delta, Ordering::SeqCst);
        }
        fn set_message(&self, _msg: String) {}
        fn finish(&self, _msg: String) {}
    }

    #[tokio::test]
    async fn reports_progress_per_period() {
        let server = portal().await;
        mount_month(&server, 1, ResponseTemplate::new(200).set_body_string(listing(&["a"]))).await;
        mount_month(&server, 2, ResponseTemplate::new(404)).await;

        let counter = Arc::new(CountingProgress {
            total: AtomicU64::new(0),
            done: AtomicU64::new(0),
        });
        let progress: Arc<dyn ProgressCallback> = counter.clone();

        let request = ScrapeRequest::new(months(2024, &[1, 2]), "").unwrap();
        scheduler_for(&server)
            .run_with_progress(&request, &progress)
            .await;

        assert_eq!(counter.total.load(Ordering::SeqCst), 2);
        assert_eq!(counter.done.load(Ordering::SeqCst), 2);
    }
}
