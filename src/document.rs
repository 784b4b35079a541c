//! Recognizers for the special wrapper shapes that appear in documents.
//!
//! Documents are plain [`serde_json::Value`]s. Two shapes get special
//! treatment during comparison and search:
//!
//! - date wrapper: `{"$date": {"$numberLong": "<epoch millis>"}}`
//! - identifier wrapper: `{"$oid": "<id>"}`

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// A recognized wrapper value.
#[derive(Debug, Clone, PartialEq)]
pub enum Special<'a> {
    /// Epoch milliseconds from a date wrapper.
    Date(i64),
    /// Identifier string from an identifier wrapper.
    ObjectId(&'a str),
}

impl<'a> Special<'a> {
    /// Recognize a wrapper shape. Plain values return `None`.
    pub fn recognize(value: &'a Value) -> Option<Self> {
        if let Some(ms) = date_millis(value) {
            return Some(Self::Date(ms));
        }
        value
            .get("$oid")
            .and_then(Value::as_str)
            .map(Self::ObjectId)
    }
}

/// Epoch millis carried by a date wrapper, if `value` is one.
///
/// `$numberLong` is normally a string; a bare number is accepted too.
pub fn date_millis(value: &Value) -> Option<i64> {
    let raw = value.get("$date")?.get("$numberLong")?;
    match raw {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Identifier carried by an identifier wrapper, if `value` is one.
pub fn object_id(value: &Value) -> Option<&str> {
    value.get("$oid").and_then(Value::as_str)
}

/// Replace wrappers with comparable scalars: dates become epoch millis,
/// identifiers become their id string. Other values are returned as-is.
pub fn unwrap_comparable(value: &Value) -> Value {
    match Special::recognize(value) {
        Some(Special::Date(ms)) => Value::from(ms),
        Some(Special::ObjectId(id)) => Value::String(id.to_string()),
        None => value.clone(),
    }
}

/// Parse a user-supplied date.
///
/// `DD/MM/YYYY` is read as UTC midnight of that day. Otherwise RFC 3339,
/// `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD HH:MM:SS` are accepted
/// (all as UTC when no offset is given), followed by a bare epoch-millis
/// integer.
pub fn parse_date_input(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.contains('/') {
        let mut parts = input.split('/');
        let day = parts.next()?.trim().parse::<u32>().ok()?;
        let month = parts.next()?.trim().parse::<u32>().ok()?;
        let year = parts.next()?.trim().parse::<i32>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    input
        .parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

/// Epoch millis for a user-supplied date string.
pub fn parse_date_millis(input: &str) -> Option<i64> {
    parse_date_input(input).map(|dt| dt.timestamp_millis())
}

/// String form used for set membership and regex tests.
///
/// Mirrors how a loosely typed runtime would stringify a scalar: numbers
/// without a trailing `.0`, `null` as `"null"`, containers as compact JSON.
pub fn string_cast(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_string(n),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::Null => String::new(),
                other => string_cast(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Numeric view of a value, coercing numeric strings and booleans.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok()
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn number_string(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
