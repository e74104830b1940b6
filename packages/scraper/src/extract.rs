//! Release link extraction from a postback response.
//!
//! The portal renders one `<div class="content-area">` holding the result
//! list. Every link inside it that points at a release page becomes a
//! [`ReleaseRecord`]. A page without that container simply has no
//! releases for the selected period.

use pib_press_models::{KeywordFilter, Period, ReleaseRecord};
use scraper::{ElementRef, Html, Selector};

/// Hrefs containing this are release pages.
pub const PRESS_RELEASE_MARKER: &str = "PressReleasePage.aspx";

/// Hrefs carrying this query parameter (any case) are release pages.
pub const RELEASE_ID_PARAM: &str = "relid=";

/// Everything recovered from one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Matching records, in page order.
    pub records: Vec<ReleaseRecord>,
    /// The portal's result-count banner, e.g. "Displaying 42 Press Releases".
    pub server_message: Option<String>,
}

/// Parses listing pages into [`ReleaseRecord`]s.
///
/// Extraction is pure: the same body, period and filter always yield the
/// same records.
#[derive(Debug, Clone)]
pub struct ReleaseExtractor {
    origin: String,
    container: Selector,
    links: Selector,
    banner: Selector,
}

impl ReleaseExtractor {
    /// Creates an extractor that absolutizes relative links against
    /// `origin` (e.g. `https://www.pib.gov.in`).
    #[must_use]
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_owned(),
            container: Selector::parse("div.content-area").unwrap_or_else(|_| unreachable!()),
            links: Selector::parse("a[href]").unwrap_or_else(|_| unreachable!()),
            banner: Selector::parse("div.search_box_result").unwrap_or_else(|_| unreachable!()),
        }
    }

    /// Extracts the records in `raw_body` that pass `filter`, each labelled
    /// with `period`.
    #[must_use]
    pub fn extract(
        &self,
        raw_body: &str,
        period: Period,
        filter: &KeywordFilter,
    ) -> Vec<ReleaseRecord> {
        self.extract_listing(raw_body, period, filter).records
    }

    /// Like [`extract`](Self::extract), also returning the server's
    /// result-count banner.
    #[must_use]
    pub fn extract_listing(
        &self,
        raw_body: &str,
        period: Period,
        filter: &KeywordFilter,
    ) -> Listing {
        let document = Html::parse_document(raw_body);

        let server_message = document
            .select(&self.banner)
            .next()
            .map(|banner| collapse_whitespace(&banner.text().collect::<String>()))
            .filter(|message| !message.is_empty());

        let Some(container) = document.select(&self.container).next() else {
            return Listing {
                records: Vec::new(),
                server_message,
            };
        };

        let label = period.label();
        let records = container
            .select(&self.links)
            .filter_map(|link| {
                let href = link.value().attr("href")?.trim();
                if !is_release_link(href) {
                    return None;
                }

                let title = resolve_title(link)?;
                if !filter.matches(&title) {
                    return None;
                }

                Some(ReleaseRecord {
                    title,
                    url: self.resolve_url(href),
                    period_label: label.clone(),
                })
            })
            .collect();

        Listing {
            records,
            server_message,
        }
    }

    /// Turns `href` into an absolute URL.
    fn resolve_url(&self, href: &str) -> String {
        if has_scheme(href) {
            href.to_owned()
        } else if href.starts_with("//") {
            format!("https:{href}")
        } else if href.starts_with('/') {
            format!("{}{href}", self.origin)
        } else {
            format!("{}/{href}", self.origin)
        }
    }
}

/// Whether `href` points at an individual release.
fn is_release_link(href: &str) -> bool {
    href.contains(PRESS_RELEASE_MARKER) || href.to_ascii_lowercase().contains(RELEASE_ID_PARAM)
}

/// The link's `title` attribute, falling back to its visible text.
fn resolve_title(link: ElementRef<'_>) -> Option<String> {
    let from_attr = link
        .value()
        .attr("title")
        .map(collapse_whitespace)
        .unwrap_or_default();
    if !from_attr.is_empty() {
        return Some(from_attr);
    }

    let from_text = collapse_whitespace(&link.text().collect::<String>());
    (!from_text.is_empty()).then_some(from_text)
}

/// `scheme:` prefix per RFC 3986 (letter, then letters, digits, `+-.`).
fn has_scheme(href: &str) -> bool {
    let Some((scheme, _)) = href.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
