//! In-memory tenant cache store.
//!
//! Entries are immutable `Arc<CacheEntry>` values swapped whole on every
//! write, so a concurrent reader sees either the old or the new collection.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde::Serialize;
use serde_json::Value;

/// `(tenant, endpoint)`.
pub type CacheKey = (String, String);

fn key(tenant: &str, endpoint: &str) -> CacheKey {
    (tenant.to_string(), endpoint.to_string())
}

/// One cached collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The collection (array or object).
    pub documents: Value,
    /// When the collection was last fetched or loaded. `None` for a seeded
    /// placeholder that has never been populated.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// A freshly loaded or fetched collection, stamped now.
    pub fn fresh(documents: Value) -> Self {
        Self {
            documents,
            fetched_at: Some(Utc::now()),
        }
    }

    /// An empty placeholder seeded at startup.
    pub fn placeholder() -> Self {
        Self {
            documents: Value::Array(Vec::new()),
            fetched_at: None,
        }
    }

    pub fn is_populated(&self) -> bool {
        self.fetched_at.is_some()
    }
}

/// Aggregate store statistics.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of tenant namespaces.
    pub tenants: usize,
    /// Number of entries, placeholders included.
    pub entries: usize,
    /// Entries holding a fetched or loaded collection.
    pub populated: usize,
}

/// Process-wide `(tenant, endpoint) → entry` map.
#[derive(Debug, Default)]
pub struct TenantCacheStore {
    entries: DashMap<CacheKey, Arc<CacheEntry>>,
    namespaces: DashSet<String>,
}

impl TenantCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tenant: &str, endpoint: &str) -> Option<Arc<CacheEntry>> {
        self.entries
            .get(&key(tenant, endpoint))
            .map(|e| Arc::clone(e.value()))
    }

    /// Replace the entry wholesale with `documents`, stamped now.
    pub fn put(&self, tenant: &str, endpoint: &str, documents: Value) -> Arc<CacheEntry> {
        self.insert(tenant, endpoint, CacheEntry::fresh(documents))
    }

    /// Replace the entry wholesale.
    pub fn insert(&self, tenant: &str, endpoint: &str, entry: CacheEntry) -> Arc<CacheEntry> {
        self.ensure_namespace(tenant);
        let entry = Arc::new(entry);
        self.entries
            .insert(key(tenant, endpoint), Arc::clone(&entry));
        entry
    }

    /// Insert an empty placeholder unless an entry already exists.
    /// Returns `true` if a placeholder was inserted.
    pub fn seed(&self, tenant: &str, endpoint: &str) -> bool {
        self.ensure_namespace(tenant);
        let mut inserted = false;
        self.entries.entry(key(tenant, endpoint)).or_insert_with(|| {
            inserted = true;
            Arc::new(CacheEntry::placeholder())
        });
        inserted
    }

    /// Remove an entry. Returns whether one was present.
    pub fn evict(&self, tenant: &str, endpoint: &str) -> bool {
        self.entries.remove(&key(tenant, endpoint)).is_some()
    }

    /// Idempotently create the bucket for `tenant`.
    pub fn ensure_namespace(&self, tenant: &str) {
        if !self.namespaces.contains(tenant) {
            self.namespaces.insert(tenant.to_string());
        }
    }

    pub fn has_namespace(&self, tenant: &str) -> bool {
        self.namespaces.contains(tenant)
    }

    /// Sorted tenant names.
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.iter().map(|t| t.key().clone()).collect();
        names.sort();
        names
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            tenants: self.namespaces.len(),
            entries: self.entries.len(),
            populated: self
                .entries
                .iter()
                .filter(|e| e.value().is_populated())
                .count(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_get() {
        let store = TenantCacheStore::new();
        assert!(store.get("t", "items").is_none());
        store.put("t", "items", json!([{"id": 1}]));
        let entry = store.get("t", "items").unwrap();
        assert_eq!(entry.documents, json!([{"id": 1}]));
        assert!(entry.is_populated());
        assert!(store.has_namespace("t"));
    }

    #[test]
    fn test_put_replaces_wholesale() {
        let store = TenantCacheStore::new();
        store.put("t", "items", json!([1, 2, 3]));
        let before = store.get("t", "items").unwrap();
        store.put("t", "items", json!([4]));
        assert_eq!(store.get("t", "items").unwrap().documents, json!([4]));
        // Readers holding the old Arc still see the complete old collection.
        assert_eq!(before.documents, json!([1, 2, 3]));
    }

    #[test]
    fn test_tenants_are_isolated() {
        let store = TenantCacheStore::new();
        store.put("a", "items", json!([1]));
        assert!(store.get("b", "items").is_none());
    }

    #[test]
    fn test_seed_does_not_overwrite() {
        let store = TenantCacheStore::new();
        assert!(store.seed("t", "items"));
        assert!(!store.get("t", "items").unwrap().is_populated());
        store.put("t", "items", json!([1]));
        assert!(!store.seed("t", "items"));
        assert_eq!(store.get("t", "items").unwrap().documents, json!([1]));
    }

    #[test]
    fn test_evict() {
        let store = TenantCacheStore::new();
        store.put("t", "items", json!([]));
        assert!(store.evict("t", "items"));
        assert!(!store.evict("t", "items"));
        assert!(store.get("t", "items").is_none());
    }

    #[test]
    fn test_ensure_namespace_idempotent() {
        let store = TenantCacheStore::new();
        store.ensure_namespace("b");
        store.ensure_namespace("a");
        store.ensure_namespace("b");
        assert_eq!(store.namespaces(), vec!["a", "b"]);
    }

    #[test]
    fn test_stats() {
        let store = TenantCacheStore::new();
        store.seed("t", "a");
        store.seed("t", "b");
        store.put("u", "a", json!([1]));
        assert_eq!(
            store.stats(),
            CacheStats {
                tenants: 2,
                entries: 3,
                populated: 1
            }
        );
    }
}
