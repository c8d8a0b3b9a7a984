//! Field rules and the value checks behind them

use chrono::NaiveDate;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Validation messages shown next to a failing field
pub mod messages {
    pub const REQUIRED_GENERIC: &str = "A response is required";
    pub const REQUIRED_CHECKBOX: &str = "Select at least one response";
    pub const INVALID_NUMBER: &str = "Response must be a valid number";
    pub const INVALID_DATE: &str = "Response must be a valid date (MM/DD/YYYY)";
    pub const INVALID_END_DATE: &str = "End date can't be before start date";
    pub const INVALID_EMAIL: &str = "Response must be a valid email address";
    pub const INVALID_URL: &str = "Response must be a valid hyperlink/URL";
    pub const INVALID_BOOLEAN: &str = "Response must be checked or unchecked";
    pub const INVALID_TEXT: &str = "Response must be text";
    pub const INVALID_CHOICE: &str = "Response must be a list of selections";
}

/// Sentinel option label that pairs with a free-text `-otherText` field
pub const OTHER_SPECIFY: &str = "Other, specify";

/// Format constraint applied to a field's value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Rule {
    Text,
    Number,
    Email,
    Url,
    Date,
    EndDate {
        #[serde(rename = "dependentField")]
        start_field: String,
    },
    /// Checkbox or radio group; at least one selection when required
    Choice,
    /// Single boolean checkbox
    ChoiceSingle,
    Dropdown,
    /// Repeating list of named rows (e.g. plans)
    Dynamic,
}

/// When a field must carry a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Requirement {
    Required,
    Optional,
    /// Required only when the sibling `field` has `includes` selected
    When { field: String, includes: String },
}

impl Requirement {
    /// Resolve against the sibling values of the form being validated
    pub fn is_required(&self, data: &Map<String, Value>) -> bool {
        match self {
            Requirement::Required => true,
            Requirement::Optional => false,
            Requirement::When { field, includes } => data
                .get(field)
                .map(|value| selection_includes(value, includes))
                .unwrap_or(false),
        }
    }
}

impl Rule {
    /// Message for a blank value when the field is required
    pub fn required_message(&self) -> &'static str {
        match self {
            Rule::Choice | Rule::Dynamic => messages::REQUIRED_CHECKBOX,
            _ => messages::REQUIRED_GENERIC,
        }
    }

    /// Whether a value counts as "no response" for this rule
    pub fn is_blank(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return true;
        };
        match (self, value) {
            (_, Value::Null) => true,
            (_, Value::String(s)) => s.trim().is_empty(),
            (Rule::Choice | Rule::Dynamic, Value::Array(items)) => items.is_empty(),
            (Rule::ChoiceSingle, Value::Bool(checked)) => !checked,
            (Rule::Dropdown, Value::Object(obj)) => obj
                .get("value")
                .and_then(Value::as_str)
                .map(|s| s.trim().is_empty())
                .unwrap_or(true),
            _ => false,
        }
    }

    /// Check a non-blank value; `data` gives access to sibling fields
    pub fn check(&self, value: &Value, data: &Map<String, Value>) -> Result<(), &'static str> {
        match self {
            Rule::Text => text_of(value).map(|_| ()).ok_or(messages::INVALID_TEXT),
            Rule::Number => match text_of(value) {
                Some(s) if is_number(&s) => Ok(()),
                _ => Err(messages::INVALID_NUMBER),
            },
            Rule::Email => match text_of(value) {
                Some(s) if is_email(&s) => Ok(()),
                _ => Err(messages::INVALID_EMAIL),
            },
            Rule::Url => match text_of(value) {
                Some(s) if is_url(&s) => Ok(()),
                _ => Err(messages::INVALID_URL),
            },
            Rule::Date => text_of(value)
                .and_then(|s| parse_date(&s))
                .map(|_| ())
                .ok_or(messages::INVALID_DATE),
            Rule::EndDate { start_field } => {
                let end = text_of(value)
                    .and_then(|s| parse_date(&s))
                    .ok_or(messages::INVALID_DATE)?;
                // An unparseable start date is reported on the start field itself
                let start = data
                    .get(start_field)
                    .and_then(text_of)
                    .and_then(|s| parse_date(&s));
                match start {
                    Some(start) if end < start => Err(messages::INVALID_END_DATE),
                    _ => Ok(()),
                }
            }
            Rule::Choice => match value {
                Value::Array(items) if items.iter().all(|i| selection_label(i).is_some()) => Ok(()),
                _ => Err(messages::INVALID_CHOICE),
            },
            Rule::ChoiceSingle => match value {
                Value::Bool(_) => Ok(()),
                _ => Err(messages::INVALID_BOOLEAN),
            },
            Rule::Dropdown => match value {
                Value::String(_) | Value::Object(_) => Ok(()),
                _ => Err(messages::INVALID_CHOICE),
            },
            Rule::Dynamic => match value {
                Value::Array(rows)
                    if rows.iter().all(|row| {
                        row.get("name")
                            .and_then(Value::as_str)
                            .map(|n| !n.trim().is_empty())
                            .unwrap_or(false)
                    }) =>
                {
                    Ok(())
                }
                _ => Err(messages::REQUIRED_GENERIC),
            },
        }
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(0|[1-9](\d*|\d{0,2}(,\d{3})*))?(\.\d*[0-9])?$")
            .expect("number pattern is valid")
    })
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(0[1-9]|1[0-2])/(0[1-9]|[12][0-9]|3[01])/\d{4}$")
            .expect("date pattern is valid")
    })
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("url pattern is valid"))
}

/// Shared numeric format: optional thousands separators and decimals
pub fn is_number(input: &str) -> bool {
    !input.is_empty() && number_pattern().is_match(input)
}

/// Parse a `MM/DD/YYYY` date, rejecting impossible calendar days
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    if !date_pattern().is_match(input) {
        return None;
    }
    NaiveDate::parse_from_str(input, "%m/%d/%Y").ok()
}

pub fn is_email(input: &str) -> bool {
    email_pattern().is_match(input)
}

pub fn is_url(input: &str) -> bool {
    url_pattern().is_match(input)
}

/// Text form of a scalar value; numbers are accepted as typed
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Label of one selection: either a bare option id or a `{key, value}` pair
pub fn selection_label(item: &Value) -> Option<&str> {
    match item {
        Value::String(s) => Some(s.as_str()),
        Value::Object(obj) => obj.get("value").and_then(Value::as_str),
        _ => None,
    }
}

/// Whether a choice value has `option` selected, matched by option id,
/// `<field>-<option>` key suffix, or label
pub fn selection_includes(value: &Value, option: &str) -> bool {
    let Value::Array(items) = value else {
        return false;
    };
    let suffix = format!("-{}", option);
    items.iter().any(|item| match item {
        Value::String(s) => s == option,
        Value::Object(obj) => {
            let key_matches = obj
                .get("key")
                .and_then(Value::as_str)
                .map(|k| k == option || k.ends_with(&suffix))
                .unwrap_or(false);
            key_matches || obj.get("value").and_then(Value::as_str) == Some(option)
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_pattern_accepts() {
        for input in ["0", "7", "123", "1234567", "1,234", "12,345,678", "0.5", ".25", "1,000.75"] {
            assert!(is_number(input), "{} should be a number", input);
        }
    }

    #[test]
    fn test_number_pattern_rejects() {
        for input in ["", " ", "01", "12,34", "1,2345", "1.", "abc", "-5", "1 000", "1.2.3"] {
            assert!(!is_number(input), "{:?} should not be a number", input);
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("07/14/2022"), NaiveDate::from_ymd_opt(2022, 7, 14));
        assert!(parse_date("02/30/2022").is_none());
        assert!(parse_date("7/14/2022").is_none());
        assert!(parse_date("2022-07-14").is_none());
    }

    #[test]
    fn test_whitespace_is_blank() {
        assert!(Rule::Text.is_blank(Some(&json!("   "))));
        assert!(Rule::Number.is_blank(Some(&json!("\t"))));
        assert!(Rule::Choice.is_blank(Some(&json!([]))));
        assert!(Rule::Text.is_blank(None));
        assert!(!Rule::Text.is_blank(Some(&json!("x"))));
    }

    #[test]
    fn test_selection_includes() {
        assert!(selection_includes(&json!(["option1", "option2"]), "option1"));
        assert!(selection_includes(
            &json!([{"key": "test1-option1", "value": "Option 1"}]),
            "option1"
        ));
        assert!(selection_includes(&json!([{"key": "k", "value": OTHER_SPECIFY}]), OTHER_SPECIFY));
        assert!(!selection_includes(&json!(["option2"]), "option1"));
        assert!(!selection_includes(&json!("option1"), "option1"));
    }

    #[test]
    fn test_end_date_ordering() {
        let rule = Rule::EndDate {
            start_field: "start".to_string(),
        };
        let data = json!({"start": "06/01/2022"});
        let data = data.as_object().unwrap();

        assert!(rule.check(&json!("06/30/2022"), data).is_ok());
        assert_eq!(
            rule.check(&json!("05/31/2022"), data),
            Err(messages::INVALID_END_DATE)
        );
    }

    #[test]
    fn test_email_and_url() {
        assert!(is_email("someone@example.gov"));
        assert!(!is_email("someone@"));
        assert!(is_url("https://example.gov/report"));
        assert!(!is_url("example.gov"));
    }
}
