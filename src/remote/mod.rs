//! Upstream data source.
//!
//! `RemoteSource` abstracts the outbound call for testability.
//! `HttpSource` talks to the real JSON API.

pub mod http;

pub use http::HttpSource;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Fetches one endpoint's collection from upstream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch `endpoint` with the given query parameters (order preserved,
    /// repeated keys allowed). The `answer` envelope is already unwrapped in
    /// the returned value.
    async fn fetch(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value>;
}

/// Unwrap an `{"answer": ...}` envelope; other bodies pass through.
pub fn normalize_response(mut body: Value) -> Value {
    if let Value::Object(map) = &mut body {
        if map.get("answer").is_some_and(|a| !a.is_null()) {
            if let Some(answer) = map.remove("answer") {
                return answer;
            }
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_unwraps_answer() {
        assert_eq!(
            normalize_response(json!({"answer": [{"id": 1}], "ok": true})),
            json!([{"id": 1}])
        );
    }

    #[test]
    fn test_normalize_passes_through() {
        assert_eq!(normalize_response(json!([1, 2])), json!([1, 2]));
        assert_eq!(
            normalize_response(json!({"rows": [1]})),
            json!({"rows": [1]})
        );
        assert_eq!(
            normalize_response(json!({"answer": null})),
            json!({"answer": null})
        );
    }
}
