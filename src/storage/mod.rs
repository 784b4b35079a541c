//! Durable persistence of endpoint collections.
//!
//! One namespace per tenant, one resource per endpoint. [`FileStorage`] maps
//! that onto `<root>/<tenant>/<endpoint>.json`.

pub mod file;

pub use file::FileStorage;

use std::fmt::Write;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::cache::CacheEntry;
use crate::error::Result;

/// Matches anything outside `[A-Za-z0-9_]` (ASCII "non-word" characters).
static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Durable backing store for endpoint collections.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Persist `documents`, unwrapping an `answer` envelope if present.
    async fn save(&self, tenant: &str, endpoint: &str, documents: &Value) -> Result<()>;

    /// Load a collection. `Ok(None)` when nothing is stored; corrupt content
    /// is an error.
    async fn load(&self, tenant: &str, endpoint: &str) -> Result<Option<Value>>;

    /// Remove a collection. Returns whether it existed.
    async fn delete(&self, tenant: &str, endpoint: &str) -> Result<bool>;
}

/// Persist the documents held by a cache entry.
pub async fn save_entry(
    storage: &dyn DocumentStorage,
    tenant: &str,
    endpoint: &str,
    entry: &CacheEntry,
) -> Result<()> {
    storage.save(tenant, endpoint, &entry.documents).await
}

/// Resource name for an endpoint: every non-word character becomes `_`,
/// suffixed `.json`. `orders/open` → `orders_open.json`.
pub fn resource_name(endpoint: &str) -> String {
    format!("{}.json", NON_WORD_RE.replace_all(endpoint, "_"))
}

/// Directory name for a tenant namespace.
///
/// `[A-Za-z0-9.-]` is kept and every other byte, `_` included, becomes
/// `_HH` (upper-case hex), so distinct tenants never share a directory.
/// `.` and `..` have their dots escaped and the empty tenant maps to a lone
/// `_`, which no other tenant can produce.
pub fn namespace_name(tenant: &str) -> String {
    if tenant.is_empty() {
        return "_".to_string();
    }
    let escape_dots = tenant == "." || tenant == "..";
    let mut name = String::with_capacity(tenant.len());
    for byte in tenant.bytes() {
        let keep = byte.is_ascii_alphanumeric() || byte == b'-' || (byte == b'.' && !escape_dots);
        if keep {
            name.push(char::from(byte));
        } else {
            // Writing to a String cannot fail.
            let _ = write!(name, "_{byte:02X}");
        }
    }
    name
}

/// The value that actually gets persisted: the `answer` field of an
/// envelope, or the documents themselves.
pub fn envelope_payload(documents: &Value) -> &Value {
    match documents.get("answer") {
        Some(answer) if !answer.is_null() => answer,
        _ => documents,
    }
}
