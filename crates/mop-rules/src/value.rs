//! Metric value model and coercion.
//!
//! Telemetry metrics and rule thresholds both arrive as arbitrary JSON. Every
//! comparison first runs both sides through [`MetricValue::coerce`], so there
//! is exactly one place that decides what counts as a number or a string.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A metric reading value the comparator understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// Any integer or floating-point value, widened to `f64`.
    Numeric(f64),
    /// Any string value.
    Text(String),
}

/// A raw value whose shape cannot take part in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unsupported {
    /// The JSON kind that was rejected (`"null"`, `"bool"`, `"array"`, `"object"`).
    pub kind: &'static str,
}

impl fmt::Display for Unsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported value type: {}", self.kind)
    }
}

impl std::error::Error for Unsupported {}

impl MetricValue {
    /// Classifies a raw JSON value.
    ///
    /// Numbers become [`MetricValue::Numeric`], strings become
    /// [`MetricValue::Text`]. Null, booleans, arrays and objects are
    /// [`Unsupported`].
    pub fn coerce(raw: &Value) -> Result<Self, Unsupported> {
        match raw {
            Value::Number(n) => n
                .as_f64()
                .map(Self::Numeric)
                .ok_or(Unsupported { kind: "number" }),
            Value::String(s) => Ok(Self::Text(s.clone())),
            other => Err(Unsupported {
                kind: json_kind(other),
            }),
        }
    }

    /// Returns the numeric interpretation of this value.
    ///
    /// Text is parsed as a float after trimming surrounding whitespace. The
    /// only non-finite spellings accepted are `Infinity` and `NaN`, optionally
    /// signed and case-sensitive.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::Text(s) => parse_number(s),
        }
    }

    /// Returns the variant name, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Text(_) => "text",
        }
    }

    /// Converts back to a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Numeric(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Numeric(value)
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        Self::Numeric(value as f64)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    // `f64::from_str` also takes `inf` and any casing of `infinity`/`nan`.
    if unsigned.starts_with(|c: char| c.is_ascii_alphabetic())
        && !matches!(unsigned, "Infinity" | "NaN")
    {
        return None;
    }
    text.parse().ok()
}

/// Returns the JSON kind name of a value.
#[must_use]
pub const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
