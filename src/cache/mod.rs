//! Tenant-scoped read-through cache.

pub mod service;
pub mod store;

pub use service::{CacheService, EvictOutcome, RefreshOutcome, TENANT_PARAM};
pub use store::{CacheEntry, CacheKey, CacheStats, TenantCacheStore};
