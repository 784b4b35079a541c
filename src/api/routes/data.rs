//! Read route.

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::params::QueryParams;
use crate::api::server::AppState;
use crate::error::PorticoError;

/// GET /data/{*alias}
///
/// Serves the (filtered, sorted, paginated) collection. An empty result is
/// a 404 with an empty `data` array.
pub async fn get_data(
    State(state): State<Arc<AppState>>,
    Path(alias): Path<String>,
    RawQuery(raw): RawQuery,
) -> Response {
    let params = QueryParams::parse(raw.as_deref());
    let alias = alias.trim_matches('/');
    let tenant = state.service.resolve_tenant(params.tenant());
    let data = state.service.get(tenant, alias, &params.to_query()).await;

    if is_empty(&data) {
        let err = PorticoError::NotFound(format!("no data for '{alias}'"));
        return (
            err.status_code(),
            Json(json!({
                "success": false,
                "data": [],
                "message": err.to_string(),
            })),
        )
            .into_response();
    }

    let body = match data {
        Value::Array(items) => json!({
            "success": true,
            "count": items.len(),
            "data": items,
        }),
        other => json!({"success": true, "data": other}),
    };
    (StatusCode::OK, Json(body)).into_response()
}

fn is_empty(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
