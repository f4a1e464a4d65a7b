use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MISSING_MARKER: &str = "N/a";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum Value {
    Text(String),
    Number(f64),
    #[default]
    Missing,
}

impl Value {
    /// Classifies a raw cell. Empty cells and the missing marker become
    /// [`Value::Missing`]; cells that read as plain numbers become
    /// [`Value::Number`]; everything else is kept verbatim as text.
    pub fn from_raw(raw: &str, missing_marker: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == missing_marker {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => Value::Number(number),
            _ => Value::Text(raw.to_string()),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the cell. Text is parsed after stripping known
    /// decorations; anything that still fails to parse is treated as missing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_numeric(s),
            Value::Missing => None,
        }
    }

    pub fn as_display(&self, missing_marker: &str) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Missing => missing_marker.to_string(),
        }
    }

    /// Key used when comparing identity fields. Missing values compare equal
    /// to each other and never to a present value.
    pub(crate) fn key_part(&self) -> String {
        match self {
            Value::Missing => String::from("\u{0}"),
            other => other.as_display(""),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display(DEFAULT_MISSING_MARKER))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::from_raw(value, DEFAULT_MISSING_MARKER)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

/// Parses a decorated numeric string such as `1,234`, `45.6%` or ` 90 `.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '%') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
