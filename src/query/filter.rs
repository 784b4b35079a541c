//! Field filters with MongoDB-style operators.
//!
//! A [`FilterSpec`] is an ordered list of `(field, condition)` pairs. A
//! document passes when every condition passes. Fields are looked up at the
//! top level of the document only; a missing field fails its condition.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Utc};
use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::document::{
    as_number, date_millis, object_id, parse_date_input, parse_date_millis, string_cast,
    unwrap_comparable,
};

/// Comparison operator inside an operator mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    /// Set membership (string-cast equality against any operand entry).
    In,
    /// Strictly greater than.
    Gt,
    /// Strictly less than.
    Lt,
    /// Case-insensitive regular expression, compiled once.
    Regex(Pattern),
    /// Anything else. Always a non-match.
    Unknown(String),
}

impl Operator {
    /// Parse an operator token. `$regex` compiles its operand here so the
    /// pattern is built once per query, not once per document.
    pub fn parse(token: &str, operand: &Value) -> Self {
        match token {
            "$in" => Self::In,
            "$gt" => Self::Gt,
            "$lt" => Self::Lt,
            "$regex" => Self::Regex(Pattern::new(operand)),
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// A `$regex` operand. Invalid or non-string patterns never match.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    compiled: Option<Regex>,
}

impl Pattern {
    pub fn new(operand: &Value) -> Self {
        let source = string_cast(operand);
        let compiled = match operand.as_str() {
            Some(pattern) => match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::debug!(pattern, error = %e, "Invalid $regex pattern, treating as non-match");
                    None
                }
            },
            None => None,
        };
        Self { source, compiled }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.compiled.as_ref().is_some_and(|re| re.is_match(haystack))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

/// Condition attached to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `{op: operand, ...}`; all operators must pass.
    Operators(Vec<(Operator, Value)>),
    /// A literal. Strings get prefix/date/id matching, arrays are implicit
    /// set membership, anything else uses coercing equality.
    Literal(Value),
}

impl Condition {
    /// Build a condition from a JSON value. Objects are operator mappings.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Operators(
                map.into_iter()
                    .map(|(op, operand)| (Operator::parse(&op, &operand), operand))
                    .collect(),
            ),
            other => Self::Literal(other),
        }
    }

    /// Whether `field` satisfies this condition.
    pub fn matches(&self, field: Option<&Value>) -> bool {
        let Some(field) = field else {
            return false;
        };
        match self {
            Self::Operators(ops) => ops.iter().all(|(op, operand)| eval_operator(op, operand, field)),
            Self::Literal(Value::String(cond)) => match_string(field, cond),
            Self::Literal(Value::Array(set)) => {
                let needle = string_cast(&unwrap_comparable(field));
                set.iter().any(|candidate| string_cast(candidate) == needle)
            }
            Self::Literal(other) => loose_eq(field, other),
        }
    }
}

/// Ordered conjunction of field conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    fields: Vec<(String, Condition)>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a condition for `field`.
    pub fn push(&mut self, field: impl Into<String>, condition: Condition) {
        self.fields.push((field.into(), condition));
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.push(field, condition);
        self
    }

    /// Build from a JSON object such as `{"status": {"$in": ["A", "B"]}}`.
    /// Non-object input yields an empty filter.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };
        Self {
            fields: map
                .into_iter()
                .map(|(field, cond)| (field, Condition::from_value(cond)))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.fields.iter().map(|(f, c)| (f.as_str(), c))
    }

    /// Whether `doc` passes every field condition.
    pub fn matches(&self, doc: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, cond)| cond.matches(doc.get(field.as_str())))
    }
}

fn eval_operator(op: &Operator, operand: &Value, field: &Value) -> bool {
    let compare = unwrap_comparable(field);
    match op {
        Operator::In => {
            let needle = string_cast(&compare);
            match operand {
                Value::Array(items) => items.iter().any(|c| string_cast(c) == needle),
                single => string_cast(single) == needle,
            }
        }
        Operator::Gt => compare_range(&compare, operand) == Some(Ordering::Greater),
        Operator::Lt => compare_range(&compare, operand) == Some(Ordering::Less),
        Operator::Regex(pattern) => pattern.is_match(&string_cast(&compare)),
        Operator::Unknown(name) => {
            tracing::debug!(operator = %name, "Unknown filter operator, treating as non-match");
            false
        }
    }
}

/// Ordering of `field` relative to `operand` for `$gt`/`$lt`.
///
/// A numeric field against a string operand reads the operand as a date
/// (epoch millis) when it parses as one, and as a plain number otherwise.
/// Two strings compare lexically; anything numeric-coercible compares
/// numerically. Other combinations are incomparable.
fn compare_range(field: &Value, operand: &Value) -> Option<Ordering> {
    match (field, operand) {
        (Value::Number(n), Value::String(s)) => {
            let bound = parse_date_millis(s)
                .map(|ms| ms as f64)
                .or_else(|| as_number(operand))?;
            n.as_f64()?.partial_cmp(&bound)
        }
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => as_number(field)?.partial_cmp(&as_number(operand)?),
    }
}

fn match_string(field: &Value, cond: &str) -> bool {
    match field {
        Value::String(s) => s.starts_with(cond),
        Value::Array(items) => items
            .iter()
            .any(|v| v.as_str().is_some_and(|s| s.starts_with(cond))),
        Value::Object(_) => {
            if let Some(id) = object_id(field) {
                return id == cond;
            }
            if let Some(ms) = date_millis(field) {
                return same_utc_day(ms, cond);
            }
            false
        }
        other => loose_eq(other, &Value::String(cond.to_string())),
    }
}

fn same_utc_day(ms: i64, cond: &str) -> bool {
    let Some(item) = DateTime::<Utc>::from_timestamp_millis(ms) else {
        return false;
    };
    let Some(input) = parse_date_input(cond) else {
        return false;
    };
    item.year() == input.year() && item.month() == input.month() && item.day() == input.day()
}

/// Coercing scalar equality.
///
/// - number vs number, or number vs numeric string: numeric equality
/// - bool vs bool, or bool vs `"true"`/`"false"`
/// - string vs string: exact
/// - null only equals null
/// - arrays and objects: deep equality with the same kind
/// - everything else: not equal
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            let parsed = Some(s.trim())
                .filter(|t| !t.is_empty())
                .and_then(|t| t.parse::<f64>().ok());
            matches!((n.as_f64(), parsed), (Some(x), Some(y)) if x == y)
        }
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(flag), Value::String(s)) | (Value::String(s), Value::Bool(flag)) => {
            s.trim() == (if *flag { "true" } else { "false" })
        }
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => a == b,
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================
