//! Eviction routes. Both require the access key.

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use super::{error_response, from_error};
use crate::api::auth::check_access_key;
use crate::api::params::QueryParams;
use crate::api::server::AppState;

/// GET /delete/{*alias}
pub async fn delete_one(
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
    RawQuery(raw): RawQuery,
) -> Response {
    let params = QueryParams::parse(raw.as_deref());
    if let Err(e) = check_access_key(params.access_key(), state.access_key()) {
        warn!(alias = %alias, "Rejected delete: {e}");
        return from_error(&e);
    }

    let alias = alias.trim_matches('/');
    let tenant = state.service.resolve_tenant(params.tenant());
    let outcome = state.service.evict(tenant, alias).await;

    let message = match (&outcome.error, outcome.existed) {
        (Some(err), _) => format!("Failed to delete cache for '{alias}': {err}"),
        (None, true) => format!("Cache deleted for '{alias}'"),
        (None, false) => format!("No cache found for '{alias}'"),
    };
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(json!({
            "success": outcome.success,
            "message": message,
            "existed": outcome.existed,
        })),
    )
        .into_response()
}

/// GET /delete-multiple?endpoint=a&endpoint=b
pub async fn delete_multiple(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let params = QueryParams::parse(raw.as_deref());
    if let Err(e) = check_access_key(params.access_key(), state.access_key()) {
        warn!("Rejected multi-delete: {e}");
        return from_error(&e);
    }

    let endpoints = params.endpoints();
    if endpoints.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No endpoints given");
    }

    let tenant = state.service.resolve_tenant(params.tenant());
    let deleted = state.service.evict_many(tenant, &endpoints).await;
    (
        StatusCode::OK,
        Json(json!({"success": true, "deleted": deleted})),
    )
        .into_response()
}
