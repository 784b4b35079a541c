//! `field:direction` sorting.

use std::cmp::Ordering;

use rand::seq::SliceRandom;
use serde_json::Value;

use crate::document::date_millis;

/// Sort direction. Unrecognized tokens fall back to [`SortDirection::Asc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
    /// Shuffle; not reproducible between calls.
    Random,
}

impl SortDirection {
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "desc" => Self::Desc,
            "random" => Self::Random,
            _ => Self::Asc,
        }
    }
}

/// Parsed `field:direction` sort request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parse `name`, `name:desc`, `createdAt:random`, ...
    ///
    /// Returns `None` when the field part is empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let (field, direction) = match raw.split_once(':') {
            Some((field, dir)) => (field, SortDirection::parse(dir)),
            None => (raw, SortDirection::Asc),
        };
        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        Some(Self::new(field, direction))
    }

    /// Sort `items` in place.
    pub fn apply(&self, items: &mut [&Value]) {
        match self.direction {
            SortDirection::Random => items.shuffle(&mut rand::rng()),
            SortDirection::Asc => {
                items.sort_by(|a, b| compare_fields(a.get(&self.field), b.get(&self.field)))
            }
            SortDirection::Desc => {
                items.sort_by(|a, b| compare_fields(b.get(&self.field), a.get(&self.field)))
            }
        }
    }
}

/// Total order used for sorting field values.
///
/// Date wrappers compare as epoch millis. Strings use a locale-like order
/// (case-folded first, then code point). Numbers compare numerically.
/// Mixed kinds order as missing < null < bool < number < string < array <
/// object.
pub fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.map(sort_key);
    let b = b.map(sort_key);
    match (&a, &b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_values(x, y),
    }
}

fn sort_key(value: &Value) -> Value {
    match date_millis(value) {
        Some(ms) => Value::from(ms),
        None => value.clone(),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => locale_cmp(x, y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn locale_cmp(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(items: &[&Value]) -> Vec<String> {
        items
            .iter()
            .map(|v| v["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            SortSpec::parse("name:desc"),
            Some(SortSpec::new("name", SortDirection::Desc))
        );
        assert_eq!(
            SortSpec::parse("name"),
            Some(SortSpec::new("name", SortDirection::Asc))
        );
        assert_eq!(
            SortSpec::parse("name:RANDOM"),
            Some(SortSpec::new("name", SortDirection::Random))
        );
        assert_eq!(
            SortSpec::parse("name:sideways"),
            Some(SortSpec::new("name", SortDirection::Asc))
        );
        assert_eq!(SortSpec::parse(":desc"), None);
    }

    #[test]
    fn test_asc_desc_are_reverses() {
        let docs = [
            json!({"name": "delta"}),
            json!({"name": "Alpha"}),
            json!({"name": "charlie"}),
            json!({"name": "bravo"}),
        ];
        let mut asc: Vec<&Value> = docs.iter().collect();
        SortSpec::new("name", SortDirection::Asc).apply(&mut asc);
        let mut desc: Vec<&Value> = docs.iter().collect();
        SortSpec::new("name", SortDirection::Desc).apply(&mut desc);

        assert_eq!(names(&asc), vec!["Alpha", "bravo", "charlie", "delta"]);
        let mut reversed = names(&desc);
        reversed.reverse();
        assert_eq!(names(&asc), reversed);
    }

    #[test]
    fn test_sort_dates_by_millis() {
        let docs = [
            json!({"name": "late", "at": {"$date": {"$numberLong": "3000"}}}),
            json!({"name": "early", "at": {"$date": {"$numberLong": "1000"}}}),
            json!({"name": "mid", "at": {"$date": {"$numberLong": "2000"}}}),
        ];
        let mut items: Vec<&Value> = docs.iter().collect();
        SortSpec::new("at", SortDirection::Asc).apply(&mut items);
        assert_eq!(names(&items), vec!["early", "mid", "late"]);
    }

    #[test]
    fn test_sort_numbers() {
        let docs = [json!({"n": 10}), json!({"n": 2}), json!({"n": 33})];
        let mut items: Vec<&Value> = docs.iter().collect();
        SortSpec::new("n", SortDirection::Desc).apply(&mut items);
        let ns: Vec<i64> = items.iter().map(|v| v["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![33, 10, 2]);
    }

    #[test]
    fn test_missing_fields_sort_first() {
        let docs = [json!({"n": 1}), json!({}), json!({"n": 0})];
        let mut items: Vec<&Value> = docs.iter().collect();
        SortSpec::new("n", SortDirection::Asc).apply(&mut items);
        assert!(items[0].get("n").is_none());
    }

    #[test]
    fn test_random_is_permutation() {
        let docs: Vec<Value> = (0..20).map(|i| json!({"i": i})).collect();
        let mut items: Vec<&Value> = docs.iter().collect();
        SortSpec::new("i", SortDirection::Random).apply(&mut items);
        let mut seen: Vec<i64> = items.iter().map(|v| v["i"].as_i64().unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<i64>>());
    }
}
