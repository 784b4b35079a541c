//! Free-text search over top-level document values.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::document::{string_cast, Special};

/// Lower-cased, whitespace-split search terms. Blank input yields no terms.
pub fn search_terms(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Whether every term is a substring of at least one searchable token.
pub fn matches_terms(doc: &Value, terms: &[String]) -> bool {
    if terms.is_empty() {
        return true;
    }
    let tokens = searchable_tokens(doc);
    terms
        .iter()
        .all(|term| tokens.iter().any(|token| token.contains(term.as_str())))
}

/// Tokens derived from a document's top-level values.
///
/// Strings are lower-cased, numbers stringified, identifier wrappers reduced
/// to their id, and date wrappers expanded into `YYYY-MM-DD` and
/// `DD/MM/YYYY`. Everything else is compact JSON, lower-cased.
pub fn searchable_tokens(doc: &Value) -> Vec<String> {
    let mut tokens = Vec::new();
    match doc {
        Value::Object(map) => map.values().for_each(|v| push_tokens(v, &mut tokens)),
        Value::Array(items) => items.iter().for_each(|v| push_tokens(v, &mut tokens)),
        scalar => push_tokens(scalar, &mut tokens),
    }
    tokens
}

fn push_tokens(value: &Value, tokens: &mut Vec<String>) {
    match value {
        Value::String(s) => tokens.push(s.to_lowercase()),
        Value::Number(_) => tokens.push(string_cast(value)),
        other => match Special::recognize(other) {
            Some(Special::ObjectId(id)) => tokens.push(id.to_string()),
            Some(Special::Date(ms)) => match DateTime::<Utc>::from_timestamp_millis(ms) {
                Some(dt) => {
                    tokens.push(dt.format("%Y-%m-%d").to_string());
                    tokens.push(dt.format("%d/%m/%Y").to_string());
                }
                None => tokens.push(String::new()),
            },
            None => tokens.push(
                serde_json::to_string(other)
                    .map(|s| s.to_lowercase())
                    .unwrap_or_default(),
            ),
        },
    }
}
