#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the PIB press release scraper.
//!
//! Collects the requested periods and keyword, runs the scraper, prints
//! the merged records as a table followed by a per-period report, and
//! optionally exports them as CSV.
//!
//! Uses `indicatif-log-bridge` (via [`progress::init_logger`]) so log
//! output and the period progress bar share the terminal cleanly.

mod present;
mod progress;

use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use pib_press_models::{Period, ScrapeRequest};
use pib_press_scraper::{PeriodScheduler, ScrapeConfig};

use crate::progress::IndicatifProgress;

/// Selection used when no period flag is given.
const DEFAULT_DATE: &str = "9-12-2024";

#[derive(Parser)]
#[command(name = "pib_press", about = "Fetch and filter PIB press releases")]
struct Cli {
    /// Specific day to fetch, as D-M-YYYY (repeatable)
    #[arg(long = "date", value_name = "D-M-YYYY", value_parser = parse_day)]
    dates: Vec<Period>,
    /// Whole month to fetch, as M-YYYY (repeatable)
    #[arg(long = "month", value_name = "M-YYYY", value_parser = parse_month)]
    months: Vec<Period>,
    /// First month of a range, as M-YYYY
    #[arg(long, value_name = "M-YYYY", value_parser = parse_month, requires = "to")]
    from: Option<Period>,
    /// Last month of a range (inclusive), as M-YYYY
    #[arg(long, value_name = "M-YYYY", value_parser = parse_month, requires = "from")]
    to: Option<Period>,
    /// Only keep releases whose title contains this (case-insensitive)
    #[arg(long, short, default_value = "")]
    keyword: String,
    /// Maximum number of periods fetched at once
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
    /// Per-period timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,
    /// Export results as CSV (defaults to `pib_data_D_M_YYYY.csv`)
    #[arg(long, value_name = "PATH")]
    csv: Option<Option<PathBuf>>,
}

fn parse_day(s: &str) -> Result<Period, String> {
    let period: Period = s.parse().map_err(|e| format!("{e}"))?;
    if period.is_whole_month() {
        return Err(format!("'{s}' selects a whole month; use --month M-YYYY"));
    }
    Ok(period)
}

fn parse_month(s: &str) -> Result<Period, String> {
    let period: Period = s.parse().map_err(|e| format!("{e}"))?;
    if !period.is_whole_month() {
        return Err(format!("'{s}' selects a single day; use --date D-M-YYYY"));
    }
    Ok(period)
}

impl Cli {
    /// Every period selected by the flags, or the default date if none.
    fn periods(&self) -> Result<Vec<Period>, Box<dyn std::error::Error>> {
        let mut periods: Vec<Period> = self.dates.iter().chain(&self.months).copied().collect();

        if let (Some(from), Some(to)) = (self.from, self.to) {
            let range = Period::months_between(from, to);
            if range.is_empty() {
                return Err(format!("--from {from} is after --to {to}").into());
            }
            periods.extend(range);
        }

        if periods.is_empty() {
            periods.push(DEFAULT_DATE.parse()?);
        }

        periods.sort_unstable();
        periods.dedup();
        Ok(periods)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = progress::init_logger();
    let cli = Cli::parse();

    let periods = cli.periods()?;
    let request = ScrapeRequest::new(periods.iter().copied(), &cli.keyword)?;

    let config = ScrapeConfig::new()
        .with_max_concurrency(cli.concurrency)
        .with_period_timeout(Duration::from_secs(cli.timeout));
    let scheduler = PeriodScheduler::new(config);

    let bar = IndicatifProgress::periods_bar(&multi, "Fetching releases");
    let result = scheduler.run_with_progress(&request, &bar).await;

    let mut stdout = std::io::stdout().lock();
    if result.records.is_empty() {
        writeln!(
            stdout,
            "No releases found. Try a different date or remove the keyword."
        )?;
    } else {
        let keyword = request.filter().term();
        writeln!(
            stdout,
            "Found {} releases matching '{keyword}'\n",
            result.records.len()
        )?;
        present::write_table(&mut stdout, &result.records)?;
    }
    writeln!(stdout)?;
    present::write_report(&mut stdout, &result)?;

    if let Some(path) = cli.csv {
        if result.records.is_empty() {
            log::warn!("Nothing to export");
        } else {
            let path = path.unwrap_or_else(|| present::default_csv_path(&periods));
            present::export_csv(&path, &result.records)?;
            writeln!(
                stdout,
                "Wrote {} records to {}",
                result.records.len(),
                path.display()
            )?;
        }
    }

    if result.is_total_failure() {
        return Err(format!("all {} period(s) failed", result.failures.len()).into());
    }

    Ok(())
}
