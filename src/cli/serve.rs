//! `portico serve`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use portico::api::{start_server, AppState};
use portico::cache::CacheService;
use portico::config::Config;

pub(crate) async fn cmd_serve(
    mut config: Config,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config
        .validate_for_serving()
        .context("Invalid configuration")?;

    let service = Arc::new(CacheService::from_config(&config)?);
    service.init_tenant(&config.default_tenant).await;
    info!(
        tenant = %config.default_tenant,
        endpoints = config.endpoints.len(),
        cache_dir = %config.cache_dir.display(),
        "Cache initialized"
    );
    if config.access_key().is_none() {
        tracing::warn!("No access key configured; update and delete routes will reject all requests");
    }

    let state = AppState::from_config(service, &config);
    start_server(&config.server, state)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))
}
