use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Canonical date format accepted on the wire (ISO 8601 extended).
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Canonical time format; seconds optional on input, always stored.
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const TIME_FORMAT_NO_SECONDS: &str = "%H:%M";
/// Canonical datetime format.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A validated, typed answer to one question.
///
/// Incoming payloads are loose JSON; validation converts each answer into
/// one of these variants so every stored response is type-correct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResponseValue {
    /// Single categorical/ordinal choice (an exact option label).
    Choice(String),
    /// Multiple categorical choices in submission order.
    Choices(Vec<String>),
    Number(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Text(String),
    Bool(bool),
}

impl ResponseValue {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ResponseValue::Date(d) => Some(*d),
            ResponseValue::DateTime(dt) => Some(dt.date()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            ResponseValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ResponseValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Canonical string form used by conditional-logic comparisons.
    ///
    /// Multi-choice answers have no single comparison form; conditions on
    /// them never match (the designer is steered towards single-choice
    /// trigger questions).
    pub fn comparison_text(&self) -> Option<String> {
        match self {
            ResponseValue::Choice(s) | ResponseValue::Text(s) => Some(s.clone()),
            ResponseValue::Bool(b) => Some(b.to_string()),
            ResponseValue::Number(n) => Some(format_number(*n)),
            ResponseValue::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
            ResponseValue::Time(t) => Some(t.format(TIME_FORMAT).to_string()),
            ResponseValue::DateTime(dt) => Some(dt.format(DATETIME_FORMAT).to_string()),
            ResponseValue::Choices(_) => None,
        }
    }

    /// Renders the value back into the raw JSON wire shape, such that
    /// re-validating it reproduces this exact value.
    pub fn to_raw(&self) -> Value {
        match self {
            ResponseValue::Choice(s) | ResponseValue::Text(s) => Value::String(s.clone()),
            ResponseValue::Choices(items) => {
                Value::Array(items.iter().map(|s| Value::String(s.clone())).collect())
            }
            ResponseValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ResponseValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            ResponseValue::Time(t) => Value::String(t.format(TIME_FORMAT).to_string()),
            ResponseValue::DateTime(dt) => Value::String(dt.format(DATETIME_FORMAT).to_string()),
            ResponseValue::Bool(b) => Value::Bool(*b),
        }
    }
}

/// Integer-friendly number formatting so `7.0` compares as `"7"`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Mapping from question code to its validated answer: exactly one entry
/// per answered active question, no entries for inactive or unknown codes.
pub type ResponseSet = BTreeMap<String, ResponseValue>;

/// Raw submission payload as received from a capture client.
pub type RawResponses = BTreeMap<String, Value>;

/// Converts a canonical ResponseSet back into the raw wire shape.
pub fn to_raw_responses(responses: &ResponseSet) -> RawResponses {
    responses
        .iter()
        .map(|(code, value)| (code.clone(), value.to_raw()))
        .collect()
}
