//! Portico: a multi-tenant read-through cache in front of a remote JSON API.
//!
//! Collections are served from memory, then disk, then upstream, and queried
//! with MongoDB-style filters, sorting, free-text search and pagination.

pub mod api;
pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod query;
pub mod remote;
pub mod storage;

pub use cache::{CacheEntry, CacheService, CacheStats, EvictOutcome, RefreshOutcome};
pub use config::Config;
pub use error::{PorticoError, Result};
pub use query::{FilterSpec, Query, SortSpec};
