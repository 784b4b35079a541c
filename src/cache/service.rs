//! Read-through cache orchestration.
//!
//! `get` resolves an entry through store → disk → upstream and never fails;
//! `refresh` and `evict` are explicit and report their errors. Writers for
//! the same `(tenant, endpoint)` are serialized by a per-key async mutex.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::store::{CacheEntry, CacheKey, TenantCacheStore};
use crate::config::Config;
use crate::error::{PorticoError, Result};
use crate::query::Query;
use crate::remote::{HttpSource, RemoteSource};
use crate::storage::{self, envelope_payload, DocumentStorage, FileStorage};

/// Query parameter carrying the tenant label, both inbound and upstream.
pub const TENANT_PARAM: &str = "ev";

/// Per-endpoint result of a refresh.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub alias: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-endpoint result of an eviction.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EvictOutcome {
    pub alias: String,
    /// Whether the durable resource existed before the eviction.
    pub existed: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Multi-tenant read-through cache in front of a [`RemoteSource`].
pub struct CacheService {
    store: TenantCacheStore,
    storage: Arc<dyn DocumentStorage>,
    remote: Arc<dyn RemoteSource>,
    locks: DashMap<CacheKey, Arc<Mutex<()>>>,
    default_tenant: String,
    endpoints: Vec<String>,
}

impl CacheService {
    pub fn new(
        storage: Arc<dyn DocumentStorage>,
        remote: Arc<dyn RemoteSource>,
        default_tenant: impl Into<String>,
        endpoints: Vec<String>,
    ) -> Self {
        Self {
            store: TenantCacheStore::new(),
            storage,
            remote,
            locks: DashMap::new(),
            default_tenant: default_tenant.into(),
            endpoints,
        }
    }

    /// Build a service backed by [`FileStorage`] and [`HttpSource`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = Arc::new(FileStorage::new(config.cache_dir.clone()));
        let remote = Arc::new(HttpSource::new(
            config.api_url.clone(),
            config.fetch_timeout(),
        )?);
        Ok(Self::new(
            storage,
            remote,
            config.default_tenant.clone(),
            config.endpoints.clone(),
        ))
    }

    pub fn store(&self) -> &TenantCacheStore {
        &self.store
    }

    pub fn default_tenant(&self) -> &str {
        &self.default_tenant
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// The requested tenant, or the default when absent or blank.
    pub fn resolve_tenant<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(self.default_tenant.as_str())
    }

    /// Take the writer lock for `(tenant, endpoint)`.
    async fn lock_key(&self, tenant: &str, endpoint: &str) -> KeyGuard<'_> {
        let key = (tenant.to_string(), endpoint.to_string());
        let lock = Arc::clone(self.locks.entry(key.clone()).or_default().value());
        let guard = lock.lock_owned().await;
        KeyGuard {
            locks: &self.locks,
            key,
            guard: Some(guard),
        }
    }

    /// Seed placeholders for every declared endpoint of `tenant` and load
    /// whatever is already on disk. Populated entries are left alone.
    pub async fn init_tenant(&self, tenant: &str) {
        self.store.ensure_namespace(tenant);
        for endpoint in &self.endpoints {
            self.store.seed(tenant, endpoint);
            if self.populated(tenant, endpoint).is_some() {
                continue;
            }
            let _guard = self.lock_key(tenant, endpoint).await;
            if self.populated(tenant, endpoint).is_some() {
                continue;
            }
            match self.storage.load(tenant, endpoint).await {
                Ok(Some(documents)) => {
                    self.store.put(tenant, endpoint, documents);
                    debug!(tenant, endpoint, "Loaded collection from disk");
                }
                Ok(None) => {}
                Err(e) => warn!(tenant, endpoint, error = %e, "Failed to load collection from disk"),
            }
        }
    }

    /// Read `endpoint` for `tenant` and run `query` over it.
    ///
    /// Falls back store → disk → upstream. Any failure along the way is
    /// logged and yields an empty array.
    pub async fn get(&self, tenant: &str, endpoint: &str, query: &Query) -> Value {
        match self.resolve(tenant, endpoint).await {
            Ok(Some(entry)) if !entry.documents.is_null() => query.evaluate(&entry.documents),
            Ok(_) => {
                debug!(tenant, endpoint, "No data available");
                Value::Array(Vec::new())
            }
            Err(e) => {
                warn!(tenant, endpoint, error = %e, "Read-through failed, serving empty result");
                Value::Array(Vec::new())
            }
        }
    }

    async fn resolve(&self, tenant: &str, endpoint: &str) -> Result<Option<Arc<CacheEntry>>> {
        if let Some(entry) = self.populated(tenant, endpoint) {
            return Ok(Some(entry));
        }

        let _guard = self.lock_key(tenant, endpoint).await;
        // Another request may have filled the entry while we waited.
        if let Some(entry) = self.populated(tenant, endpoint) {
            return Ok(Some(entry));
        }

        match self.storage.load(tenant, endpoint).await {
            Ok(Some(documents)) => {
                debug!(tenant, endpoint, "Cache miss served from disk");
                return Ok(Some(self.store.put(tenant, endpoint, documents)));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(tenant, endpoint, error = %e, "Disk fallback failed, trying upstream");
            }
        }

        info!(tenant, endpoint, "Cache miss, fetching from upstream");
        let params = vec![(TENANT_PARAM.to_string(), tenant.to_string())];
        let fetched = self.remote.fetch(endpoint, &params).await?;
        let written = self.write_through(tenant, endpoint, fetched).await?;

        // Serve exactly what was persisted.
        match self.storage.load(tenant, endpoint).await? {
            Some(documents) => Ok(Some(self.store.put(tenant, endpoint, documents))),
            None => Ok(Some(written)),
        }
    }

    fn populated(&self, tenant: &str, endpoint: &str) -> Option<Arc<CacheEntry>> {
        self.store
            .get(tenant, endpoint)
            .filter(|entry| entry.is_populated())
    }

    /// Persist first, then swap the in-memory entry. A failed save leaves
    /// the store untouched.
    async fn write_through(
        &self,
        tenant: &str,
        endpoint: &str,
        documents: Value,
    ) -> Result<Arc<CacheEntry>> {
        let entry = CacheEntry::fresh(envelope_payload(&documents).clone());
        storage::save_entry(self.storage.as_ref(), tenant, endpoint, &entry).await?;
        Ok(self.store.insert(tenant, endpoint, entry))
    }

    /// Unconditionally refetch `endpoint` and overwrite store and disk.
    ///
    /// The tenant comes from the `ev` parameter (default tenant otherwise)
    /// and is always forwarded upstream. On failure the previous state is
    /// kept and the error returned.
    pub async fn refresh(&self, endpoint: &str, params: &[(String, String)]) -> Result<()> {
        if endpoint.trim().is_empty() {
            return Err(PorticoError::InvalidRequest("empty endpoint".into()));
        }
        let requested = params
            .iter()
            .find(|(k, _)| k == TENANT_PARAM)
            .map(|(_, v)| v.as_str());
        let tenant = self.resolve_tenant(requested).to_string();

        let mut upstream: Vec<(String, String)> = params
            .iter()
            .filter(|(k, v)| k != TENANT_PARAM || !v.trim().is_empty())
            .cloned()
            .collect();
        if !upstream.iter().any(|(k, _)| k == TENANT_PARAM) {
            upstream.push((TENANT_PARAM.to_string(), tenant.clone()));
        }

        let _guard = self.lock_key(&tenant, endpoint).await;

        let fetched = self.remote.fetch(endpoint, &upstream).await.map_err(|e| {
            warn!(tenant = %tenant, endpoint, error = %e, "Refresh fetch failed");
            e
        })?;
        self.write_through(&tenant, endpoint, fetched).await?;
        info!(tenant = %tenant, endpoint, "Cache refreshed");
        Ok(())
    }

    /// Refresh several endpoints concurrently with the same parameters.
    pub async fn refresh_many(
        &self,
        endpoints: &[String],
        params: &[(String, String)],
    ) -> Vec<RefreshOutcome> {
        join_all(endpoints.iter().map(|alias| async move {
            match self.refresh(alias, params).await {
                Ok(()) => RefreshOutcome {
                    alias: alias.clone(),
                    success: true,
                    error: None,
                },
                Err(e) => RefreshOutcome {
                    alias: alias.clone(),
                    success: false,
                    error: Some(e.to_string()),
                },
            }
        }))
        .await
    }

    /// Remove `endpoint` for `tenant` from disk and memory.
    ///
    /// Evicting something that was never cached reports `existed: false`
    /// and still succeeds. If the file cannot be removed the in-memory entry
    /// is kept.
    pub async fn evict(&self, tenant: &str, endpoint: &str) -> EvictOutcome {
        let _guard = self.lock_key(tenant, endpoint).await;
        match self.storage.delete(tenant, endpoint).await {
            Ok(existed) => {
                self.store.evict(tenant, endpoint);
                info!(tenant, endpoint, existed, "Cache evicted");
                EvictOutcome {
                    alias: endpoint.to_string(),
                    existed,
                    success: true,
                    error: None,
                }
            }
            Err(e) => {
                warn!(tenant, endpoint, error = %e, "Eviction failed");
                EvictOutcome {
                    alias: endpoint.to_string(),
                    existed: false,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Evict several endpoints concurrently.
    pub async fn evict_many(&self, tenant: &str, endpoints: &[String]) -> Vec<EvictOutcome> {
        join_all(endpoints.iter().map(|alias| self.evict(tenant, alias))).await
    }
}

/// Held writer lock for one key. Dropping it releases the mutex and removes
/// the map entry once no other task holds or waits on it.
struct KeyGuard<'a> {
    locks: &'a DashMap<CacheKey, Arc<Mutex<()>>>,
    key: CacheKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // The owned guard keeps its own reference, release it first.
        self.guard.take();
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

// ============================================================================
// Tests
// ============================================================================
