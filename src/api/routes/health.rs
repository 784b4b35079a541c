//! Liveness and cache statistics.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::server::AppState;

/// GET /health. No access key required.
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let service = &state.service;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "default_tenant": service.default_tenant(),
        "tenants": service.store().namespaces(),
        "cache": service.store().stats(),
    }))
}
