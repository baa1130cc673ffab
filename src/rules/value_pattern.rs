//! Compiled scalar constraints attached to a rule's `value`.
use super::groups::OrderedTokens;
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub const VALUE: &str = "value";
pub const VALUE_PATTERN: &str = "value-pattern";
pub const VALUE_NUMERIC_RANGE: &str = "value-numeric-range";
pub const VALUE_DATE_RANGE: &str = "value-date-range";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValuePatternError {
    #[error("invalid regular expression '{pattern}': {reason}")]
    Regex { pattern: String, reason: String },
    #[error("range must be a list of two bounds, got {0}")]
    RangeShape(String),
    #[error("'{0}' is not a decimal number")]
    Decimal(String),
    #[error("'{0}' is not a calendar date")]
    Date(String),
}

/// A closed interval `[low, high]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRange<T> {
    pub low: T,
    pub high: T,
}

impl<T: PartialOrd> ValueRange<T> {
    pub fn in_range(&self, v: &T) -> bool {
        self.low <= *v && *v <= self.high
    }
}

impl<T: fmt::Display> fmt::Display for ValueRange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "from {} to {}", self.low, self.high)
    }
}

/// The single compiled form of a rule's value constraint.
#[derive(Debug, Clone)]
pub enum ValuePattern {
    Regex(Regex),
    NumericRange(ValueRange<Decimal>),
    DateRange(ValueRange<NaiveDate>),
    /// Membership in a literal or group-resolved option set.
    OneOf(Arc<OrderedTokens>),
    Literal(Value),
}

impl ValuePattern {
    /// Finds which value field an entry carries.
    ///
    /// Entries are expected to carry exactly one; if several are present the
    /// first of pattern, numeric range, date range, literal is taken.
    pub fn select(entry: &Map<String, Value>) -> Option<(&'static str, &Value)> {
        [VALUE_PATTERN, VALUE_NUMERIC_RANGE, VALUE_DATE_RANGE, VALUE]
            .into_iter()
            .find_map(|field| entry.get(field).map(|raw| (field, raw)))
    }

    /// Compiles the raw contents of one of the value fields.
    pub fn compile(field: &str, raw: &Value) -> Result<Self, ValuePatternError> {
        match field {
            VALUE_PATTERN => Ok(ValuePattern::Regex(compile_regex(&scalar_text(raw))?)),
            VALUE_NUMERIC_RANGE => {
                let (low, high) = bounds(raw)?;
                Ok(ValuePattern::NumericRange(ValueRange { low: parse_decimal(low)?, high: parse_decimal(high)? }))
            }
            VALUE_DATE_RANGE => {
                let (low, high) = bounds(raw)?;
                Ok(ValuePattern::DateRange(ValueRange { low: parse_date(&scalar_text(low))?, high: parse_date(&scalar_text(high))? }))
            }
            _ => Ok(ValuePattern::Literal(raw.clone())),
        }
    }

    /// Tests a fact's lexical value against the constraint.
    ///
    /// Range forms reject text that does not parse as their bound type.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            ValuePattern::Regex(re) => re.is_match(text),
            ValuePattern::NumericRange(range) => {
                parse_decimal_str(text).map_or(false, |v| range.in_range(&v))
            }
            ValuePattern::DateRange(range) => parse_date(text).map_or(false, |d| range.in_range(&d)),
            ValuePattern::OneOf(options) => options.contains(text),
            ValuePattern::Literal(Value::String(s)) => s == text,
            ValuePattern::Literal(Value::Array(items)) => {
                items.iter().any(|item| scalar_text(item) == text)
            }
            ValuePattern::Literal(other) => scalar_text(other) == text,
        }
    }
}

pub(crate) fn compile_regex(pattern: &str) -> Result<Regex, ValuePatternError> {
    Regex::new(pattern).map_err(|e| ValuePatternError::Regex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn scalar_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn bounds(raw: &Value) -> Result<(&Value, &Value), ValuePatternError> {
    match raw.as_array().map(Vec::as_slice) {
        Some([low, high]) => Ok((low, high)),
        _ => Err(ValuePatternError::RangeShape(raw.to_string())),
    }
}

fn parse_decimal(raw: &Value) -> Result<Decimal, ValuePatternError> {
    let text = scalar_text(raw);
    parse_decimal_str(&text).ok_or(ValuePatternError::Decimal(text))
}

fn parse_decimal_str(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Parses an `xs:date` or `xs:dateTime` lexical value, dropping any time of day.
pub fn parse_date(text: &str) -> Result<NaiveDate, ValuePatternError> {
    let text = text.trim();
    let invalid = || ValuePatternError::Date(text.to_string());
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(stamp) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Ok(stamp.date());
    }
    // Timezone or fractional seconds after the date part.
    match (text.get(..10), text.get(10..11)) {
        (Some(day), Some("T" | "Z" | "+" | "-")) => {
            NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("1.5", true)]
    #[case("1.0", true)]
    #[case("2.00", true)]
    #[case("0.9999", false)]
    #[case("2.0000001", false)]
    #[case("abc", false)]
    fn test_numeric_range_is_decimal_exact(#[case] text: &str, #[case] expected: bool) {
        let p = ValuePattern::compile(VALUE_NUMERIC_RANGE, &json!(["1", 2])).unwrap();
        assert_eq!(p.matches(text), expected);
    }

    #[rstest]
    #[case("2024-01-01", true)]
    #[case("2024-12-31T23:59:59", true)]
    #[case("2025-01-01", false)]
    #[case("2023-12-31", false)]
    #[case("2024-06-30Z", true)]
    #[case("June 2024", false)]
    fn test_date_range_ignores_time_of_day(#[case] text: &str, #[case] expected: bool) {
        let p = ValuePattern::compile(VALUE_DATE_RANGE, &json!(["2024-01-01", "2024-12-31"])).unwrap();
        assert_eq!(p.matches(text), expected);
    }

    #[test]
    fn test_regex_is_not_anchored_implicitly() {
        let p = ValuePattern::compile(VALUE_PATTERN, &json!("[0-9]{10}")).unwrap();
        assert!(p.matches("CIK 0000320193"));
        assert!(!p.matches("320193"));
    }

    #[test]
    fn test_bad_inputs() {
        assert!(matches!(
            ValuePattern::compile(VALUE_PATTERN, &json!("(")),
            Err(ValuePatternError::Regex { .. })
        ));
        assert!(matches!(
            ValuePattern::compile(VALUE_NUMERIC_RANGE, &json!([1])),
            Err(ValuePatternError::RangeShape(_))
        ));
        assert_eq!(
            ValuePattern::compile(VALUE_DATE_RANGE, &json!(["2024-13-01", "2024-12-31"])).unwrap_err(),
            ValuePatternError::Date("2024-13-01".into())
        );
    }

    #[test]
    fn test_select_prefers_compiled_forms() {
        let entry = json!({ "value": "x", "value-pattern": "^x$" });
        let (field, _) = ValuePattern::select(entry.as_object().unwrap()).unwrap();
        assert_eq!(field, VALUE_PATTERN);
        assert!(ValuePattern::select(&Map::new()).is_none());
    }

    #[test]
    fn test_literal_matching() {
        assert!(ValuePattern::Literal(json!("true")).matches("true"));
        assert!(ValuePattern::Literal(json!(true)).matches("true"));
        assert!(ValuePattern::Literal(json!(["FY", "Q1"])).matches("Q1"));
        assert!(!ValuePattern::Literal(json!(["FY", "Q1"])).matches("Q2"));
    }

    #[test]
    fn test_range_display() {
        let r = ValueRange { low: 1, high: 5 };
        assert_eq!(r.to_string(), "from 1 to 5");
        assert!(r.in_range(&1) && r.in_range(&5) && !r.in_range(&6));
    }
}
