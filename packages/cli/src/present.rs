//! Rendering of a [`MergedResult`]: a plain-text table, a per-period
//! status report and CSV export.

use std::io::Write;
use std::path::{Path, PathBuf};

use pib_press_models::{Period, ReleaseRecord};
use pib_press_scraper::MergedResult;

/// Titles longer than this are cut in the terminal table (not in CSV).
const MAX_TITLE_WIDTH: usize = 72;

/// Writes the records as an aligned `Title | URL | Date` table.
///
/// # Errors
///
/// Returns any I/O error from `out`.
pub fn write_table(out: &mut impl Write, records: &[ReleaseRecord]) -> std::io::Result<()> {
    let titles: Vec<String> = records
        .iter()
        .map(|r| truncate(&r.title, MAX_TITLE_WIDTH))
        .collect();
    let title_width = titles
        .iter()
        .map(|t| t.chars().count())
        .max()
        .unwrap_or(0)
        .max("Title".len());
    let url_width = records
        .iter()
        .map(|r| r.url.len())
        .max()
        .unwrap_or(0)
        .max("URL".len());

    writeln!(out, "{:<title_width$}  {:<url_width$}  Date", "Title", "URL")?;
    writeln!(out, "{}  {}  ----", "-".repeat(title_width), "-".repeat(url_width))?;
    for (record, title) in records.iter().zip(&titles) {
        writeln!(
            out,
            "{title:<title_width$}  {:<url_width$}  {}",
            record.url, record.period_label
        )?;
    }

    Ok(())
}

/// Writes which periods came back empty and which failed, and why.
///
/// # Errors
///
/// Returns any I/O error from `out`.
pub fn write_report(out: &mut impl Write, result: &MergedResult) -> std::io::Result<()> {
    let mut empty: Vec<Period> = result.empty_periods().collect();
    empty.sort_unstable();
    for period in empty {
        writeln!(out, "{period}: no matching releases")?;
    }

    let mut failures: Vec<_> = result.failures.iter().collect();
    failures.sort_by_key(|f| f.period);
    for failure in failures {
        writeln!(out, "{}: FAILED ({})", failure.period, failure.reason)?;
    }

    Ok(())
}

/// Serializes the records as CSV with a `Title,URL,Date` header.
///
/// # Errors
///
/// Returns [`csv::Error`] if writing fails.
pub fn write_csv(out: impl Write, records: &[ReleaseRecord]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the records to a CSV file at `path`.
///
/// # Errors
///
/// Returns [`csv::Error`] if the file cannot be created or written.
pub fn export_csv(path: &Path, records: &[ReleaseRecord]) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_csv(file, records)
}

/// Default export file name: `pib_data_D_M_YYYY.csv` for a single period,
/// `pib_data.csv` otherwise.
#[must_use]
pub fn default_csv_path(periods: &[Period]) -> PathBuf {
    match periods {
        [period] => PathBuf::from(format!(
            "pib_data_{}_{}_{}.csv",
            period.day(),
            period.month(),
            period.year()
        )),
        _ => PathBuf::from("pib_data.csv"),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
