//! Route handlers.

pub mod data;
pub mod delete;
pub mod health;
pub mod update;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::PorticoError;

/// `{success: false, error}` with the given status.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({"success": false, "error": message.into()})),
    )
        .into_response()
}

/// Error body with the status the error maps to.
pub(crate) fn from_error(err: &PorticoError) -> Response {
    error_response(err.status_code(), err.to_string())
}

/// Fallback for unknown paths.
pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Route not found")
}
