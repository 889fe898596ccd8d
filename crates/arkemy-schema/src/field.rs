//! Field metadata and typed cell values
//!
//! A [`FieldSpec`] carries the declared type and optional numeric bounds of a
//! column. Coercion turns a raw text cell into a [`Value`]; bounds are checked
//! after coercion and never alter the value.

use crate::error::CoerceError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text, passed through unchanged
    #[default]
    String,
    /// Whole number
    Integer,
    /// Floating point number
    Float,
    /// Calendar date (time of day is discarded)
    Datetime,
    /// True/false flag
    Boolean,
}

impl FieldType {
    /// Whether numeric bounds apply to this type
    #[inline]
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Lowercase name as written in the schema file
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Datetime => "datetime",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field metadata from the `fields` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Declared type
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// Human-readable description shown in validation messages
    #[serde(default)]
    pub description: String,
    /// Inclusive lower bound for numeric fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    /// Inclusive upper bound for numeric fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

/// Outcome of checking a value against declared bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundCheck {
    /// Inside bounds, null, or no bounds declared
    Within,
    /// Strictly below `min_value`
    Below,
    /// Strictly above `max_value`
    Above,
}

const NULL_TOKENS: &[&str] = &["", "nan", "null", "none", "nat", "<na>", "n/a"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

impl FieldSpec {
    /// Create spec of the given type without bounds
    #[inline]
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Self::default()
        }
    }

    /// With inclusive bounds
    #[inline]
    #[must_use]
    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    /// Whether any bound is declared
    #[inline]
    #[must_use]
    pub fn has_bounds(&self) -> bool {
        self.min_value.is_some() || self.max_value.is_some()
    }

    /// Convert a raw cell to the declared type
    ///
    /// `None`, blank cells and the usual null spellings (`NaN`, `null`,
    /// `NaT`, ...) become [`Value::Null`] for every type.
    ///
    /// # Errors
    /// Returns [`CoerceError`] when a non-null cell cannot be parsed.
    pub fn coerce(&self, raw: Option<&str>) -> Result<Value, CoerceError> {
        let Some(text) = raw.map(str::trim) else {
            return Ok(Value::Null);
        };
        if is_null_token(text) {
            return Ok(Value::Null);
        }

        match self.field_type {
            FieldType::String => Ok(Value::Text(text.to_string())),
            FieldType::Float => parse_float(text).map(Value::Float),
            FieldType::Integer => parse_integer(text).map(Value::Integer),
            FieldType::Datetime => parse_date(text).map(Value::Date),
            FieldType::Boolean => parse_bool(text).map(Value::Bool),
        }
    }

    /// Check a coerced value against declared bounds
    #[must_use]
    pub fn check_bounds(&self, value: &Value) -> BoundCheck {
        if !self.field_type.is_numeric() {
            return BoundCheck::Within;
        }
        let Some(number) = value.as_f64() else {
            return BoundCheck::Within;
        };
        if self.min_value.is_some_and(|min| number < min) {
            BoundCheck::Below
        } else if self.max_value.is_some_and(|max| number > max) {
            BoundCheck::Above
        } else {
            BoundCheck::Within
        }
    }
}

fn is_null_token(text: &str) -> bool {
    NULL_TOKENS.iter().any(|t| text.eq_ignore_ascii_case(t))
}

/// Decimal comma as exported by Norwegian locales
///
/// A single comma followed by exactly three digits reads as a thousands
/// separator and is rejected rather than guessed.
fn parse_decimal_comma(text: &str) -> Option<f64> {
    let (whole, fraction) = text.split_once(',')?;
    if text.contains('.')
        || fraction.contains(',')
        || fraction.is_empty()
        || !fraction.bytes().all(|b| b.is_ascii_digit())
        || fraction.len() == 3
    {
        return None;
    }
    format!("{whole}.{fraction}").parse().ok()
}

fn parse_float(text: &str) -> Result<f64, CoerceError> {
    let parsed = text.parse::<f64>().ok().or_else(|| parse_decimal_comma(text));
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(CoerceError::NonNumeric(text.to_string())),
    }
}

fn parse_integer(text: &str) -> Result<i64, CoerceError> {
    if let Ok(v) = text.parse::<i64>() {
        return Ok(v);
    }
    let v = parse_float(text)?;
    #[allow(clippy::cast_possible_truncation)]
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        Ok(v as i64)
    } else {
        Err(CoerceError::NonNumeric(text.to_string()))
    }
}

/// Parse a calendar date from the formats the source systems export
///
/// # Errors
/// Returns [`CoerceError::InvalidDate`] when no known format matches.
pub fn parse_date(text: &str) -> Result<NaiveDate, CoerceError> {
    let text = text.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.date_naive())
        .map_err(|_| CoerceError::InvalidDate(text.to_string()))
}

fn parse_bool(text: &str) -> Result<bool, CoerceError> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => Err(CoerceError::InvalidBoolean(text.to_string())),
    }
}

/// A typed cell
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing or blank
    #[default]
    Null,
    /// Text
    Text(String),
    /// Whole number
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Calendar date
    Date(NaiveDate),
    /// Flag
    Bool(bool),
}

impl Value {
    /// Whether the cell is null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the cell
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view with null treated as zero
    #[inline]
    #[must_use]
    pub fn as_f64_or_zero(&self) -> f64 {
        self.as_f64().unwrap_or(0.0)
    }

    /// Text view of the cell
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Date view of the cell
    #[inline]
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Grouping key: the display form of a non-null cell
    #[must_use]
    pub fn to_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) if s.is_empty() => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(s) => f.write_str(s),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn null_tokens_coerce_to_null() {
        let spec = FieldSpec::new(FieldType::Float);
        for raw in ["", "  ", "NaN", "nan", "null", "None", "NaT", "<NA>"] {
            assert_eq!(spec.coerce(Some(raw)), Ok(Value::Null), "raw = {raw:?}");
        }
        assert_eq!(spec.coerce(None), Ok(Value::Null));
    }

    #[test]
    fn float_accepts_decimal_comma() {
        let spec = FieldSpec::new(FieldType::Float);
        assert_eq!(spec.coerce(Some("7,5")), Ok(Value::Float(7.5)));
        assert_eq!(spec.coerce(Some("-0,25")), Ok(Value::Float(-0.25)));
        assert_eq!(spec.coerce(Some("7.5")), Ok(Value::Float(7.5)));
    }

    #[test]
    fn thousands_separator_is_not_a_decimal_comma() {
        let spec = FieldSpec::new(FieldType::Float);
        for text in ["1,000", "1,234,567", "12,", "1,5e3"] {
            assert_eq!(
                spec.coerce(Some(text)),
                Err(CoerceError::NonNumeric(text.to_string())),
                "{text}"
            );
        }
    }

    #[test]
    fn float_rejects_text() {
        let spec = FieldSpec::new(FieldType::Float);
        assert_eq!(
            spec.coerce(Some("eight")),
            Err(CoerceError::NonNumeric("eight".to_string()))
        );
        assert!(spec.coerce(Some("inf")).is_err());
    }

    #[test]
    fn integer_accepts_whole_floats() {
        let spec = FieldSpec::new(FieldType::Integer);
        assert_eq!(spec.coerce(Some("42")), Ok(Value::Integer(42)));
        assert_eq!(spec.coerce(Some("42.0")), Ok(Value::Integer(42)));
        assert!(spec.coerce(Some("42.5")).is_err());
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date("2024-01-10"), Ok(date(2024, 1, 10)));
        assert_eq!(parse_date("10.01.2024"), Ok(date(2024, 1, 10)));
        assert_eq!(parse_date("2024-01-10 13:45:00"), Ok(date(2024, 1, 10)));
        assert_eq!(parse_date("2024-01-10T13:45:00"), Ok(date(2024, 1, 10)));
        assert_eq!(parse_date("2024-01-10T13:45:00+01:00"), Ok(date(2024, 1, 10)));
        assert!(parse_date("2024-13-40").is_err());
    }

    #[test]
    fn boolean_spellings() {
        let spec = FieldSpec::new(FieldType::Boolean);
        assert_eq!(spec.coerce(Some("Yes")), Ok(Value::Bool(true)));
        assert_eq!(spec.coerce(Some("0")), Ok(Value::Bool(false)));
        assert!(spec.coerce(Some("maybe")).is_err());
    }

    #[test]
    fn string_passes_through_trimmed() {
        let spec = FieldSpec::new(FieldType::String);
        assert_eq!(spec.coerce(Some(" P1 ")), Ok(Value::from("P1")));
    }

    #[test]
    fn bounds_flag_without_altering() {
        let spec = FieldSpec::new(FieldType::Float).with_bounds(Some(0.0), Some(24.0));
        assert_eq!(spec.check_bounds(&Value::Float(-1.0)), BoundCheck::Below);
        assert_eq!(spec.check_bounds(&Value::Float(30.0)), BoundCheck::Above);
        assert_eq!(spec.check_bounds(&Value::Float(24.0)), BoundCheck::Within);
        assert_eq!(spec.check_bounds(&Value::Null), BoundCheck::Within);
    }

    #[test]
    fn bounds_ignored_for_text() {
        let spec = FieldSpec::new(FieldType::String).with_bounds(Some(0.0), None);
        assert_eq!(spec.check_bounds(&Value::from("x")), BoundCheck::Within);
    }

    #[test]
    fn value_keys() {
        assert_eq!(Value::Null.to_key(), None);
        assert_eq!(Value::from("").to_key(), None);
        assert_eq!(Value::from("P1").to_key(), Some("P1".to_string()));
        assert_eq!(Value::Integer(2024).to_key(), Some("2024".to_string()));
        assert_eq!(
            Value::Date(date(2024, 1, 10)).to_key(),
            Some("2024-01-10".to_string())
        );
    }
}
