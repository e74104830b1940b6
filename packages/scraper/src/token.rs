//! Session token probe.
//!
//! A postback is only accepted if it replays the `__VIEWSTATE`,
//! `__VIEWSTATEGENERATOR` and `__EVENTVALIDATION` hidden inputs issued to
//! the same session. [`probe`] loads the search page and pulls them out.

use scraper::{Html, Selector};

use crate::retry;
use crate::{FetchError, ScrapeConfig, TokenError, TokenField};

/// Hidden state issued by one page load.
///
/// Valid for exactly one postback on the session that fetched it, so it is
/// neither `Clone` nor cached: [`crate::postback::build`] consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct SessionTokens {
    /// `__VIEWSTATE`
    pub view_state: String,
    /// `__VIEWSTATEGENERATOR`
    pub view_state_generator: String,
    /// `__EVENTVALIDATION`
    pub event_validation: String,
}

/// Loads the search page on `client` and extracts its session tokens.
///
/// # Errors
///
/// Returns [`FetchError::HttpStatus`] or [`FetchError::Network`] if the
/// page cannot be loaded, and [`FetchError::ProbeFailed`] if any token is
/// missing from it.
pub async fn probe(
    client: &reqwest::Client,
    config: &ScrapeConfig,
) -> Result<SessionTokens, FetchError> {
    log::debug!("Probing {} for session tokens", config.endpoint_url);

    let html = retry::send_text(client.get(&config.endpoint_url)).await?;

    Ok(parse_tokens(&html)?)
}

/// Extracts the three hidden token inputs from a search page.
///
/// Values are returned verbatim. An input without a `value` attribute
/// counts as missing.
///
/// # Errors
///
/// Returns [`TokenError::MissingToken`] naming the first absent field.
pub fn parse_tokens(html: &str) -> Result<SessionTokens, TokenError> {
    let document = Html::parse_document(html);

    let value_of = |field: TokenField| -> Result<String, TokenError> {
        let selector = Selector::parse(&format!(r#"input[id="{}"]"#, field.id()))
            .unwrap_or_else(|_| unreachable!());
        document
            .select(&selector)
            .find_map(|input| input.value().attr("value"))
            .map(str::to_owned)
            .ok_or(TokenError::MissingToken(field))
    };

    Ok(SessionTokens {
        view_state: value_of(TokenField::ViewState)?,
        view_state_generator: value_of(TokenField::ViewStateGenerator)?,
        event_validation: value_of(TokenField::EventValidation)?,
    })
}
