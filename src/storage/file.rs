//! Filesystem-backed [`DocumentStorage`].

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{envelope_payload, namespace_name, resource_name, DocumentStorage};
use crate::error::{PorticoError, Result};

/// Stores each collection as pretty-printed JSON at
/// `<root>/<tenant>/<endpoint>.json`.
///
/// Writes go to a sibling `.tmp` file first and are renamed into place, so a
/// reader never sees a half-written collection.
///
/// # Example
///
/// ```
/// # tokio_test::block_on(async {
/// use portico::storage::{DocumentStorage, FileStorage};
/// use serde_json::json;
///
/// let dir = tempfile::tempdir().unwrap();
/// let storage = FileStorage::new(dir.path());
/// storage
///     .save("acme", "orders/open", &json!({"answer": [{"id": 1}]}))
///     .await
///     .unwrap();
/// assert!(dir.path().join("acme/orders_open.json").exists());
/// assert_eq!(
///     storage.load("acme", "orders/open").await.unwrap(),
///     Some(json!([{"id": 1}]))
/// );
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Full path of the resource for `(tenant, endpoint)`.
    pub fn path_for(&self, tenant: &str, endpoint: &str) -> PathBuf {
        self.root
            .join(namespace_name(tenant))
            .join(resource_name(endpoint))
    }
}

#[async_trait]
impl DocumentStorage for FileStorage {
    async fn save(&self, tenant: &str, endpoint: &str, documents: &Value) -> Result<()> {
        let path = self.path_for(tenant, endpoint);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let data = serde_json::to_string_pretty(envelope_payload(documents))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(tenant, endpoint, path = %path.display(), "Saved collection");
        Ok(())
    }

    async fn load(&self, tenant: &str, endpoint: &str) -> Result<Option<Value>> {
        let path = self.path_for(tenant, endpoint);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let documents = serde_json::from_str(&data).map_err(|e| {
            PorticoError::Parse(format!("corrupt cache file {}: {}", path.display(), e))
        })?;
        Ok(Some(documents))
    }

    async fn delete(&self, tenant: &str, endpoint: &str) -> Result<bool> {
        let path = self.path_for(tenant, endpoint);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
