//! Document query evaluation: filter → sort → search → pagination.
//!
//! Pure functions over an in-memory collection. Non-array collections are
//! returned untouched.

pub mod filter;
pub mod search;
pub mod sort;

pub use filter::{Condition, FilterSpec, Operator};
pub use sort::{SortDirection, SortSpec};

use serde_json::Value;

/// A complete query against one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: FilterSpec,
    pub sort: Option<SortSpec>,
    pub search: Option<String>,
    pub skip: usize,
    /// `None` means unbounded.
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Run the query over `documents`.
    ///
    /// Arrays go through filter, sort, search and pagination in that order.
    /// Any other value is returned as-is.
    pub fn evaluate(&self, documents: &Value) -> Value {
        let Value::Array(items) = documents else {
            return documents.clone();
        };

        let mut selected: Vec<&Value> = if self.filter.is_empty() {
            items.iter().collect()
        } else {
            items.iter().filter(|doc| self.filter.matches(doc)).collect()
        };

        if let Some(ref sort) = self.sort {
            sort.apply(&mut selected);
        }

        if let Some(ref raw) = self.search {
            let terms = search::search_terms(raw);
            if !terms.is_empty() {
                selected.retain(|doc| search::matches_terms(doc, &terms));
            }
        }

        Value::Array(
            paginate(selected, self.skip, self.limit)
                .into_iter()
                .cloned()
                .collect(),
        )
    }
}

/// Slice `[skip, skip + limit)` clipped to the available length.
pub fn paginate<T>(items: Vec<T>, skip: usize, limit: Option<usize>) -> Vec<T> {
    items
        .into_iter()
        .skip(skip)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}
