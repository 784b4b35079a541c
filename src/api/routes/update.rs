//! Refresh routes. Both require the access key.

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use super::{error_response, from_error};
use crate::api::auth::{check_access_key, ACCESS_KEY_PARAM};
use crate::api::params::{QueryParams, ENDPOINT_PARAM};
use crate::api::server::AppState;

/// Parameters never forwarded upstream.
const NOT_FORWARDED: &[&str] = &[ACCESS_KEY_PARAM, "token", ENDPOINT_PARAM];

/// GET /update/{*alias}
pub async fn update_one(
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
    RawQuery(raw): RawQuery,
) -> Response {
    let params = QueryParams::parse(raw.as_deref());
    if let Err(e) = check_access_key(params.access_key(), state.access_key()) {
        warn!(alias = %alias, "Rejected update: {e}");
        return from_error(&e);
    }

    let alias = alias.trim_matches('/');
    let service = &state.service;
    service
        .init_tenant(service.resolve_tenant(params.tenant()))
        .await;

    match service.refresh(alias, &params.without(NOT_FORWARDED)).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": format!("Cache updated for '{alias}'"),
            })),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// GET /update-multiple?endpoint=a&endpoint=b
pub async fn update_multiple(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Response {
    let params = QueryParams::parse(raw.as_deref());
    if let Err(e) = check_access_key(params.access_key(), state.access_key()) {
        warn!("Rejected multi-update: {e}");
        return from_error(&e);
    }

    let endpoints = params.endpoints();
    if endpoints.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No endpoints given");
    }

    let service = &state.service;
    service
        .init_tenant(service.resolve_tenant(params.tenant()))
        .await;
    let updated = service
        .refresh_many(&endpoints, &params.without(NOT_FORWARDED))
        .await;
    (
        StatusCode::OK,
        Json(json!({"success": true, "updated": updated})),
    )
        .into_response()
}
