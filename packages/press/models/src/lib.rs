#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Value types shared between the press release scraper and its callers.
//!
//! A caller describes what it wants with a [`ScrapeRequest`] (a set of
//! [`Period`]s plus a [`KeywordFilter`]) and receives [`ReleaseRecord`]s
//! back. All types here are immutable values built before any network
//! activity happens.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Earliest year the portal's year selector offers.
pub const MIN_YEAR: i32 = 2000;

/// Latest year accepted for a [`Period`].
pub const MAX_YEAR: i32 = 2030;

/// Errors produced while constructing or parsing a [`Period`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    /// Day outside `0..=31`.
    #[error("invalid day {0} (expected 0-31, 0 meaning the whole month)")]
    InvalidDay(u32),

    /// Month outside `1..=12`.
    #[error("invalid month {0} (expected 1-12)")]
    InvalidMonth(u32),

    /// Year outside [`MIN_YEAR`]`..=`[`MAX_YEAR`].
    #[error("invalid year {0} (expected {MIN_YEAR}-{MAX_YEAR})")]
    InvalidYear(i32),

    /// The input string is not `D-M-YYYY` or `M-YYYY`.
    #[error("malformed period '{0}' (expected D-M-YYYY or M-YYYY)")]
    Malformed(String),
}

/// A day/month/year selection driving one postback.
///
/// `day == 0` selects the whole month. Only ranges are checked; whether
/// e.g. 31 February exists is left to the portal.
///
/// Field order makes the derived [`Ord`] chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u8,
    day: u8,
}

impl Period {
    /// Creates a validated period. Pass `day = 0` for a whole month.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError`] if any component is out of range.
    pub fn new(day: u32, month: u32, year: i32) -> Result<Self, PeriodError> {
        let day = u8::try_from(day)
            .ok()
            .filter(|d| *d <= 31)
            .ok_or(PeriodError::InvalidDay(day))?;
        let month = u8::try_from(month)
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or(PeriodError::InvalidMonth(month))?;
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(PeriodError::InvalidYear(year));
        }

        Ok(Self { year, month, day })
    }

    /// Creates a whole-month period.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError`] if the month or year is out of range.
    pub fn whole_month(month: u32, year: i32) -> Result<Self, PeriodError> {
        Self::new(0, month, year)
    }

    /// Every whole-month period from `from` through `to`, inclusive.
    ///
    /// Only the month and year of the bounds are used. Returns an empty
    /// list when `from` is after `to`.
    #[must_use]
    pub fn months_between(from: Self, to: Self) -> Vec<Self> {
        let mut months = Vec::new();
        let (mut year, mut month) = (from.year, from.month);

        while (year, month) <= (to.year, to.month) {
            months.push(Self {
                year,
                month,
                day: 0,
            });
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }

        months
    }

    /// The selected day, `0` for a whole month.
    #[must_use]
    pub const fn day(&self) -> u32 {
        self.day as u32
    }

    /// The selected month (1-12).
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month as u32
    }

    /// The selected year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Whether this period covers an entire month.
    #[must_use]
    pub const fn is_whole_month(&self) -> bool {
        self.day == 0
    }

    /// Display label stamped on every record fetched for this period,
    /// e.g. `"9-12-2024"` or `"Month-12-2024"`.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_whole_month() {
            write!(f, "Month-{}-{}", self.month, self.year)
        } else {
            write!(f, "{}-{}-{}", self.day, self.month, self.year)
        }
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    /// Parses `D-M-YYYY` (specific day) or `M-YYYY` (whole month). The
    /// `Month-M-YYYY` label form is accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PeriodError::Malformed(s.to_owned());

        let trimmed = s.trim();
        let body = trimmed
            .get(..6)
            .filter(|prefix| prefix.eq_ignore_ascii_case("month-"))
            .map_or(trimmed, |_| &trimmed[6..]);

        let parts: Vec<&str> = body.split('-').map(str::trim).collect();
        let number = |part: &str| part.parse::<u32>().map_err(|_| malformed());

        match *parts.as_slice() {
            [day, month, year] if body.len() == trimmed.len() => Self::new(
                number(day)?,
                number(month)?,
                year.parse().map_err(|_| malformed())?,
            ),
            [month, year] => {
                Self::whole_month(number(month)?, year.parse().map_err(|_| malformed())?)
            }
            _ => Err(malformed()),
        }
    }
}

/// Case-insensitive substring filter applied to release titles.
///
/// An empty (or whitespace-only) term matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFilter {
    term: String,
    needle: String,
}

impl KeywordFilter {
    /// Creates a filter for `term`. Surrounding whitespace is ignored.
    #[must_use]
    pub fn new(term: &str) -> Self {
        let term = term.trim().to_owned();
        let needle = term.to_lowercase();
        Self { term, needle }
    }

    /// A filter that keeps every record.
    #[must_use]
    pub fn match_all() -> Self {
        Self::default()
    }

    /// The term as supplied, trimmed.
    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Whether this filter keeps everything.
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        self.needle.is_empty()
    }

    /// Returns `true` if `title` should be kept.
    #[must_use]
    pub fn matches(&self, title: &str) -> bool {
        self.is_match_all() || title.to_lowercase().contains(&self.needle)
    }
}

/// One press release listing.
///
/// Serializes to the `Title,URL,Date` column layout used for CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRecord {
    /// Release headline, never empty.
    #[serde(rename = "Title")]
    pub title: String,
    /// Absolute link to the release page.
    #[serde(rename = "URL")]
    pub url: String,
    /// Label of the period the release was fetched for.
    #[serde(rename = "Date")]
    pub period_label: String,
}

/// Errors produced while building a [`ScrapeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// No period was supplied.
    #[error("at least one period must be requested")]
    NoPeriods,
}

/// Everything a scrape needs from its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    periods: BTreeSet<Period>,
    filter: KeywordFilter,
}

impl ScrapeRequest {
    /// Builds a request. Duplicate periods collapse into one.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::NoPeriods`] if `periods` is empty.
    pub fn new(
        periods: impl IntoIterator<Item = Period>,
        keyword: &str,
    ) -> Result<Self, RequestError> {
        let periods: BTreeSet<Period> = periods.into_iter().collect();
        if periods.is_empty() {
            return Err(RequestError::NoPeriods);
        }

        Ok(Self {
            periods,
            filter: KeywordFilter::new(keyword),
        })
    }

    /// The requested periods in chronological order.
    #[must_use]
    pub const fn periods(&self) -> &BTreeSet<Period> {
        &self.periods
    }

    /// The keyword filter.
    #[must_use]
    pub const fn filter(&self) -> &KeywordFilter {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_specific_day() {
        let period = Period::new(9, 12, 2024).unwrap();
        assert_eq!(period.label(), "9-12-2024");
    }

    #[test]
    fn labels_whole_month() {
        let period = Period::whole_month(12, 2024).unwrap();
        assert_eq!(period.label(), "Month-12-2024");
        assert!(period.is_whole_month());
    }

    #[test]
    fn rejects_out_of_range_components() {
        assert_eq!(Period::new(32, 1, 2024), Err(PeriodError::InvalidDay(32)));
        assert_eq!(Period::new(1, 0, 2024), Err(PeriodError::InvalidMonth(0)));
        assert_eq!(Period::new(1, 13, 2024), Err(PeriodError::InvalidMonth(13)));
        assert_eq!(Period::new(1, 1, 1999), Err(PeriodError::InvalidYear(1999)));
        assert_eq!(Period::new(1, 1, 2031), Err(PeriodError::InvalidYear(2031)));
    }

    #[test]
    fn accepts_day_without_calendar_check() {
        assert!(Period::new(31, 2, 2024).is_ok());
    }

    #[test]
    fn parses_day_and_month_forms() {
        assert_eq!(
            "9-12-2024".parse::<Period>().unwrap(),
            Period::new(9, 12, 2024).unwrap()
        );
        assert_eq!(
            "1-2024".parse::<Period>().unwrap(),
            Period::whole_month(1, 2024).unwrap()
        );
        assert_eq!(
            "Month-2-2024".parse::<Period>().unwrap(),
            Period::whole_month(2, 2024).unwrap()
        );
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(matches!(
            "2024".parse::<Period>(),
            Err(PeriodError::Malformed(_))
        ));
        assert!(matches!(
            "a-b-c".parse::<Period>(),
            Err(PeriodError::Malformed(_))
        ));
        assert!(matches!(
            "month-1-2-2024".parse::<Period>(),
            Err(PeriodError::Malformed(_))
        ));
        assert_eq!(
            "1-13-2024".parse::<Period>(),
            Err(PeriodError::InvalidMonth(13))
        );
    }

    #[test]
    fn months_between_crosses_year_boundary() {
        let from = Period::whole_month(11, 2023).unwrap();
        let to = Period::whole_month(2, 2024).unwrap();
        let labels: Vec<String> = Period::months_between(from, to)
            .iter()
            .map(Period::label)
            .collect();
        assert_eq!(
            labels,
            vec!["Month-11-2023", "Month-12-2023", "Month-1-2024", "Month-2-2024"]
        );
    }

    #[test]
    fn months_between_is_empty_when_reversed() {
        let from = Period::whole_month(3, 2024).unwrap();
        let to = Period::whole_month(1, 2024).unwrap();
        assert!(Period::months_between(from, to).is_empty());
    }

    #[test]
    fn periods_order_chronologically() {
        let a = Period::new(31, 1, 2024).unwrap();
        let b = Period::new(1, 2, 2024).unwrap();
        let c = Period::new(1, 1, 2025).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn keyword_filter_is_case_insensitive() {
        let filter = KeywordFilter::new("rbi");
        assert!(filter.matches("RBI Monetary Policy"));
        assert!(!filter.matches("Budget speech"));
    }

    #[test]
    fn empty_keyword_matches_everything() {
        assert!(KeywordFilter::new("").matches("anything"));
        assert!(KeywordFilter::new("   ").is_match_all());
        assert!(KeywordFilter::match_all().matches(""));
    }

    #[test]
    fn request_requires_a_period() {
        assert_eq!(
            ScrapeRequest::new(Vec::new(), "finance"),
            Err(RequestError::NoPeriods)
        );
    }

    #[test]
    fn request_collapses_duplicate_periods() {
        let period = Period::new(9, 12, 2024).unwrap();
        let request = ScrapeRequest::new([period, period], " Finance ").unwrap();
        assert_eq!(request.periods().len(), 1);
        assert_eq!(request.filter().term(), "Finance");
    }
}
