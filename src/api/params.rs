//! Query-string parsing for the data and admin routes.
//!
//! The raw query is kept as an ordered list of pairs so repeated keys and
//! bracket syntax survive. Everything that is not a reserved key becomes a
//! filter field:
//!
//! - `status=A` is a literal condition
//! - `status=A&status=B` and `status[]=A&status[]=B` are implicit `$in`
//! - `age[$gt]=30` is an operator condition; `$in` operands split on commas

use serde_json::Value;

use super::auth::ACCESS_KEY_PARAM;
use crate::cache::TENANT_PARAM;
use crate::query::{Condition, FilterSpec, Operator, Query, SortSpec};

/// Keys that steer the query instead of filtering documents.
const RESERVED: &[&str] = &[
    TENANT_PARAM,
    "limit",
    "skip",
    "sort",
    "search",
    ACCESS_KEY_PARAM,
    "token",
];

/// Key listing endpoints on the multi-endpoint routes.
pub const ENDPOINT_PARAM: &str = "endpoint";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Decode a raw (`application/x-www-form-urlencoded`) query string.
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
        Self { pairs }
    }

    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// All pairs except those whose key is in `keys`.
    pub fn without(&self, keys: &[&str]) -> Vec<(String, String)> {
        self.pairs
            .iter()
            .filter(|(k, _)| !keys.contains(&k.as_str()))
            .cloned()
            .collect()
    }

    /// Requested tenant, if any.
    pub fn tenant(&self) -> Option<&str> {
        self.get(TENANT_PARAM).filter(|t| !t.trim().is_empty())
    }

    pub fn access_key(&self) -> Option<&str> {
        self.get(ACCESS_KEY_PARAM)
    }

    /// Trimmed, non-empty `endpoint` values. A single value may also be a
    /// comma-separated list.
    pub fn endpoints(&self) -> Vec<String> {
        self.get_all(ENDPOINT_PARAM)
            .into_iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect()
    }

    /// Build the document filter from every non-reserved key.
    pub fn to_filter(&self) -> FilterSpec {
        let mut groups: Vec<(String, FieldGroup)> = Vec::new();
        for (key, value) in &self.pairs {
            let (field, op) = split_key(key);
            if field.is_empty() || RESERVED.contains(&field) {
                continue;
            }
            let idx = match groups.iter().position(|(f, _)| f == field) {
                Some(idx) => idx,
                None => {
                    groups.push((field.to_string(), FieldGroup::default()));
                    groups.len() - 1
                }
            };
            let group = &mut groups[idx].1;
            match op {
                None => group.literals.push(value.clone()),
                Some("") => {
                    group.implicit_in = true;
                    group.literals.push(value.clone());
                }
                Some(op) => group.operators.push((op.to_string(), value.clone())),
            }
        }

        let mut filter = FilterSpec::new();
        for (field, group) in groups {
            filter.push(field, group.into_condition());
        }
        filter
    }

    /// Full query: filter, sort, search and pagination.
    ///
    /// Unparseable `skip`/`limit` fall back to 0 and unbounded; `limit=0`
    /// also means unbounded.
    pub fn to_query(&self) -> Query {
        let mut query = Query::new().with_filter(self.to_filter());
        if let Some(sort) = self.get("sort").and_then(SortSpec::parse) {
            query = query.with_sort(sort);
        }
        if let Some(search) = self.get("search").filter(|s| !s.trim().is_empty()) {
            query = query.with_search(search);
        }
        if let Some(skip) = self.get("skip").and_then(|s| s.trim().parse::<usize>().ok()) {
            query = query.with_skip(skip);
        }
        if let Some(limit) = self
            .get("limit")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|l| *l > 0)
        {
            query = query.with_limit(limit);
        }
        query
    }
}

#[derive(Debug, Default)]
struct FieldGroup {
    literals: Vec<String>,
    operators: Vec<(String, String)>,
    implicit_in: bool,
}

impl FieldGroup {
    fn into_condition(self) -> Condition {
        if !self.operators.is_empty() {
            let mut ops: Vec<(Operator, Value)> = self
                .operators
                .into_iter()
                .map(|(token, raw)| {
                    let operand = if token == "$in" {
                        split_operand(&raw)
                    } else {
                        Value::String(raw)
                    };
                    (Operator::parse(&token, &operand), operand)
                })
                .collect();
            if !self.literals.is_empty() {
                ops.push((Operator::In, strings(self.literals)));
            }
            return Condition::Operators(ops);
        }
        if self.implicit_in || self.literals.len() > 1 {
            return Condition::Operators(vec![(Operator::In, strings(self.literals))]);
        }
        Condition::Literal(
            self.literals
                .into_iter()
                .next()
                .map(Value::String)
                .unwrap_or(Value::Null),
        )
    }
}

/// `field[op]` → `("field", Some("op"))`, `field[]` → `("field", Some(""))`,
/// anything else → `(key, None)`.
fn split_key(key: &str) -> (&str, Option<&str>) {
    if let Some(open) = key.find('[') {
        if let Some(inner) = key[open + 1..].strip_suffix(']') {
            return (&key[..open], Some(inner));
        }
    }
    (key, None)
}

fn split_operand(raw: &str) -> Value {
    strings(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    )
}

fn strings(items: Vec<String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}
