//! Axum HTTP server.

use std::sync::Arc;

use axum::middleware as axum_mw;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cache::CacheService;
use crate::config::{Config, ServerConfig};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CacheService>,
    /// Secret for the update and delete routes. `None` rejects them all.
    pub access_key: Option<String>,
}

impl AppState {
    pub fn new(service: Arc<CacheService>, access_key: Option<String>) -> Self {
        Self {
            service,
            access_key,
        }
    }

    pub fn from_config(service: Arc<CacheService>, config: &Config) -> Self {
        Self::new(service, config.access_key().map(String::from))
    }

    pub fn access_key(&self) -> Option<&str> {
        self.access_key.as_deref()
    }
}

/// Build the router with every route and the response layers.
pub fn build_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/data/{*alias}", get(super::routes::data::get_data))
        .route("/update/{*alias}", get(super::routes::update::update_one))
        .route(
            "/update-multiple",
            get(super::routes::update::update_multiple),
        )
        .route("/delete/{*alias}", get(super::routes::delete::delete_one))
        .route(
            "/delete-multiple",
            get(super::routes::delete::delete_multiple),
        )
        .route("/health", get(super::routes::health::get_health))
        .fallback(super::routes::not_found)
        .layer(axum_mw::from_fn(super::middleware::no_store_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Bind and serve until Ctrl-C.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = build_router(state);
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Portico listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Portico stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PorticoError;
    use crate::remote::MockRemoteSource;
    use crate::storage::{DocumentStorage, FileStorage};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    const KEY: &str = "s3cret";

    struct Harness {
        _tmp: TempDir,
        storage: Arc<FileStorage>,
        service: Arc<CacheService>,
    }

    impl Harness {
        fn new(remote: MockRemoteSource) -> Self {
            let tmp = TempDir::new().unwrap();
            let storage = Arc::new(FileStorage::new(tmp.path()));
            let service = Arc::new(CacheService::new(
                storage.clone(),
                Arc::new(remote),
                "undefined",
                vec!["items".to_string()],
            ));
            Self {
                _tmp: tmp,
                storage,
                service,
            }
        }

        fn router(&self) -> Router {
            build_router(AppState::new(self.service.clone(), Some(KEY.to_string())))
        }

        async fn call(&self, uri: &str) -> (StatusCode, Value) {
            let resp = self
                .router()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            let status = resp.status();
            assert_eq!(
                resp.headers()[header::CACHE_CONTROL],
                "no-store, no-cache, must-revalidate, proxy-revalidate"
            );
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, serde_json::from_slice(&bytes).unwrap())
        }
    }

    fn never_called() -> MockRemoteSource {
        let mut remote = MockRemoteSource::new();
        remote.expect_fetch().never();
        remote
    }

    fn serving(body: Value) -> MockRemoteSource {
        let mut remote = MockRemoteSource::new();
        remote
            .expect_fetch()
            .returning(move |_, _| Ok(body.clone()));
        remote
    }

    #[tokio::test]
    async fn test_data_reads_through_and_filters() {
        let h = Harness::new(serving(json!([
            {"status": "A", "n": 1},
            {"status": "B", "n": 2},
            {"status": "A", "n": 3}
        ])));
        let (status, body) = h.call("/data/items?status=A&sort=n:desc&limit=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"], json!([{"status": "A", "n": 3}]));
    }

    #[tokio::test]
    async fn test_data_nested_alias_and_tenant() {
        let h = Harness::new(never_called());
        h.storage
            .save("acme", "orders/open", &json!([{"id": 9}]))
            .await
            .unwrap();
        let (status, body) = h.call("/data/orders/open?ev=acme").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([{"id": 9}]));
    }

    #[tokio::test]
    async fn test_data_object_collection_has_no_count() {
        let h = Harness::new(serving(json!({"total": 2})));
        let (status, body) = h.call("/data/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"total": 2}));
        assert!(body.get("count").is_none());
    }

    #[tokio::test]
    async fn test_data_empty_is_404() {
        let mut remote = MockRemoteSource::new();
        remote
            .expect_fetch()
            .returning(|_, _| Err(PorticoError::Fetch("down".into())));
        let h = Harness::new(remote);
        let (status, body) = h.call("/data/items").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["message"], "Not found: no data for 'items'");
    }

    #[tokio::test]
    async fn test_update_requires_key_and_leaves_state_alone() {
        let h = Harness::new(never_called());
        h.storage.save("undefined", "items", &json!([1])).await.unwrap();

        for uri in [
            "/update/items",
            "/update/items?access-key=wrong",
            "/update-multiple?endpoint=items&access-key=wrong",
            "/delete/items?access-key=wrong",
            "/delete-multiple?endpoint=items",
        ] {
            let (status, body) = h.call(uri).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
            assert_eq!(body["success"], false);
            assert!(body["error"].is_string());
        }
        assert!(h.service.store().get("undefined", "items").is_none());
        assert_eq!(
            h.storage.load("undefined", "items").await.unwrap(),
            Some(json!([1]))
        );
    }

    #[tokio::test]
    async fn test_update_refreshes_and_forwards_params() {
        let mut remote = MockRemoteSource::new();
        remote
            .expect_fetch()
            .withf(|endpoint, params| {
                endpoint == "items"
                    && params.iter().any(|(k, v)| k == "ev" && v == "acme")
                    && params.iter().any(|(k, v)| k == "since" && v == "2024")
                    && !params.iter().any(|(k, _)| k == "access-key")
            })
            .times(1)
            .returning(|_, _| Ok(json!([{"id": 1}])));
        let h = Harness::new(remote);

        let (status, body) = h
            .call("/update/items?ev=acme&since=2024&access-key=s3cret")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(
            h.storage.load("acme", "items").await.unwrap(),
            Some(json!([{"id": 1}]))
        );
        assert!(h.service.store().has_namespace("acme"));
    }

    #[tokio::test]
    async fn test_update_failure_is_500() {
        let mut remote = MockRemoteSource::new();
        remote
            .expect_fetch()
            .returning(|_, _| Err(PorticoError::Fetch("down".into())));
        let h = Harness::new(remote);
        let (status, body) = h.call("/update/items?access-key=s3cret").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("down"));
    }

    #[tokio::test]
    async fn test_update_multiple() {
        let mut remote = MockRemoteSource::new();
        remote.expect_fetch().returning(|endpoint, _| match endpoint {
            "bad" => Err(PorticoError::Fetch("nope".into())),
            _ => Ok(json!([])),
        });
        let h = Harness::new(remote);

        let (status, body) = h
            .call("/update-multiple?endpoint=items&endpoint=bad&access-key=s3cret")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["updated"][0], json!({"alias": "items", "success": true}));
        assert_eq!(body["updated"][1]["alias"], "bad");
        assert_eq!(body["updated"][1]["success"], false);
    }

    #[tokio::test]
    async fn test_multiple_without_endpoints_is_400() {
        let h = Harness::new(never_called());
        let (status, _) = h.call("/update-multiple?access-key=s3cret").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = h.call("/delete-multiple?access-key=s3cret").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_one() {
        let h = Harness::new(never_called());
        h.storage.save("undefined", "items", &json!([1])).await.unwrap();

        let (status, body) = h.call("/delete/items?access-key=s3cret").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["existed"], true);
        assert_eq!(h.storage.load("undefined", "items").await.unwrap(), None);

        let (status, body) = h.call("/delete/items?access-key=s3cret").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["existed"], false);
    }

    #[tokio::test]
    async fn test_delete_multiple() {
        let h = Harness::new(never_called());
        h.storage.save("t", "a", &json!([1])).await.unwrap();

        let (status, body) = h
            .call("/delete-multiple?ev=t&endpoint=a&endpoint=b&access-key=s3cret")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["deleted"],
            json!([
                {"alias": "a", "existed": true, "success": true},
                {"alias": "b", "existed": false, "success": true}
            ])
        );
    }

    #[tokio::test]
    async fn test_health_and_unknown_route() {
        let h = Harness::new(never_called());
        let (status, body) = h.call("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = h.call("/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[test]
    fn test_app_state_from_config_ignores_empty_key() {
        let service = Arc::new(CacheService::new(
            Arc::new(crate::storage::MockDocumentStorage::new()),
            Arc::new(MockRemoteSource::new()),
            "undefined",
            vec![],
        ));
        let config = Config {
            access_key: Some(String::new()),
            ..Config::default()
        };
        assert!(AppState::from_config(service, &config).access_key().is_none());
    }
}
