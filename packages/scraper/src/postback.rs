//! "Change selection" postback form.
//!
//! Mirrors what the portal's day drop-down submits when its value
//! changes: event markers, the replayed session tokens, the fixed
//! region/language/ministry selectors and the selected date.

use pib_press_models::Period;

use crate::TokenField;
use crate::token::SessionTokens;

/// Control whose change the postback claims to come from.
pub const EVENT_TARGET: &str = "ctl00$ContentPlaceHolder1$ddlday";

/// Day drop-down. `"0"` selects the whole month.
pub const DAY_FIELD: &str = "ctl00$ContentPlaceHolder1$ddlday";
/// Month drop-down.
pub const MONTH_FIELD: &str = "ctl00$ContentPlaceHolder1$ddlMonth";
/// Year drop-down.
pub const YEAR_FIELD: &str = "ctl00$ContentPlaceHolder1$ddlYear";

/// Region 3 is the national (Delhi) feed.
const REGION_ID: &str = "3";
/// Language 1 is English.
const LANGUAGE_ID: &str = "1";
/// Ministry 0 is "all ministries".
const MINISTRY_ID: &str = "0";

/// Ordered form fields for one postback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPayload {
    fields: Vec<(&'static str, String)>,
}

impl FormPayload {
    /// All fields in submission order.
    #[must_use]
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    /// Looks up a field's value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Builds the postback selecting `period`, consuming `tokens`.
#[must_use]
pub fn build(period: Period, tokens: SessionTokens) -> FormPayload {
    let fixed = |value: &str| value.to_owned();

    FormPayload {
        fields: vec![
            ("__EVENTTARGET", fixed(EVENT_TARGET)),
            ("__EVENTARGUMENT", String::new()),
            ("__LASTFOCUS", String::new()),
            (TokenField::ViewState.id(), tokens.view_state),
            (
                TokenField::ViewStateGenerator.id(),
                tokens.view_state_generator,
            ),
            ("__VIEWSTATEENCRYPTED", String::new()),
            (TokenField::EventValidation.id(), tokens.event_validation),
            ("ctl00$Bar1$ddlregion", fixed(REGION_ID)),
            ("ctl00$Bar1$ddlLang", fixed(LANGUAGE_ID)),
            ("ctl00$ContentPlaceHolder1$hydregionid", fixed(REGION_ID)),
            ("ctl00$ContentPlaceHolder1$hydLangid", fixed(LANGUAGE_ID)),
            ("ctl00$ContentPlaceHolder1$ddlMinistry", fixed(MINISTRY_ID)),
            (DAY_FIELD, period.day().to_string()),
            (MONTH_FIELD, period.month().to_string()),
            (YEAR_FIELD, period.year().to_string()),
        ],
    }
}
