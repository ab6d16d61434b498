//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the operational handlers
//! - Merge routes registered by the embedder
//! - Wire up middleware (request ID, tracing, timeout, body limit, timing)
//! - Serve on a bound listener with graceful shutdown and a drain deadline

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::http::handlers;
use crate::http::middleware::{track_http_metrics, UntimedPath};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::{Lifecycle, Shutdown};
use crate::observability::MetricsRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: MetricsRegistry,
    pub lifecycle: Lifecycle,
    pub service_name: Arc<str>,
}

/// Error type for a server that was already serving.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("in-flight requests did not drain within {0:?}")]
    DrainTimeout(Duration),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// HTTP server for the users API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server.
    ///
    /// `routes` are merged next to the built-in ones and instrumented the same
    /// way; they must not redefine `/health`, `/ready`, `/info` or the
    /// metrics path.
    pub fn new(config: &ServiceConfig, state: AppState, routes: Router) -> Self {
        Self {
            router: Self::build_router(config, state, routes),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layer order (outermost first):
    /// 1. SetRequestId - assign `x-request-id`
    /// 2. TraceLayer - request spans
    /// 3. PropagateRequestId - echo the ID on the response
    /// 4. track_http_metrics - every route and the fallback, except the
    ///    scrape endpoint
    /// 5. TimeoutLayer - 408 after `timeouts.request_secs`
    /// 6. RequestBodyLimitLayer - 413 above `listener.max_body_bytes`
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState, routes: Router) -> Router {
        let metrics_path = config.observability.metrics_path.as_str();

        Router::new()
            .route("/health", get(handlers::health))
            .route("/ready", get(handlers::readiness))
            .route("/info", get(handlers::info))
            .route(metrics_path, get(handlers::metrics))
            .with_state(state)
            .merge(routes)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn_with_state(
                UntimedPath::new(metrics_path),
                track_http_metrics,
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Get the assembled router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    ///
    /// After the trigger, in-flight requests get `grace` to finish. The
    /// subscription happens before this returns, so a trigger sent while the
    /// future is not yet polled is not lost.
    pub fn run(
        self,
        listener: TcpListener,
        shutdown: &Shutdown,
        grace: Duration,
    ) -> impl Future<Output = Result<(), ServeError>> + Send + 'static {
        let mut graceful_rx = shutdown.subscribe();
        let mut drain_rx = shutdown.subscribe();
        let router = self.router;

        async move {
            let addr = listener.local_addr()?;
            tracing::info!(address = %addr, "HTTP server starting");

            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = graceful_rx.recv().await;
                })
                .into_future();
            tokio::pin!(serve);

            tokio::select! {
                result = &mut serve => result?,
                _ = drain_rx.recv() => {
                    tracing::info!(grace_secs = grace.as_secs(), "Draining in-flight requests");
                    match tokio::time::timeout(grace, &mut serve).await {
                        Ok(result) => result?,
                        Err(_) => {
                            tracing::warn!(grace_secs = grace.as_secs(), "Drain deadline exceeded, aborting server");
                            return Err(ServeError::DrainTimeout(grace));
                        }
                    }
                }
            }

            tracing::info!("HTTP server stopped");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Phase;
    use crate::observability::collectors::BuildInfoCollector;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use std::sync::OnceLock;
    use tower::ServiceExt;

    // The recorder is process-wide, so every router test shares one registry.
    fn registry() -> MetricsRegistry {
        static REGISTRY: OnceLock<MetricsRegistry> = OnceLock::new();
        REGISTRY
            .get_or_init(|| {
                MetricsRegistry::install(vec![Box::new(BuildInfoCollector)])
                    .expect("first install in this process")
            })
            .clone()
    }

    fn state(lifecycle: Lifecycle) -> AppState {
        AppState {
            registry: registry(),
            lifecycle,
            service_name: Arc::from("users-api"),
        }
    }

    fn app(config: &ServiceConfig, lifecycle: Lifecycle, routes: Router) -> Router {
        HttpServer::new(config, state(lifecycle), routes).router()
    }

    async fn send_get(router: Router, uri: &str) -> Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_registry_lists_collectors() {
        assert_eq!(registry().collector_names(), vec!["build_info"]);
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_readiness_follows_lifecycle() {
        let config = ServiceConfig::default();
        let lifecycle = Lifecycle::new();

        let response = send_get(app(&config, lifecycle.clone(), Router::new()), "/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_string(response).await, r#"{"status":"not_started"}"#);

        lifecycle.advance(Phase::MetricsInitialized).unwrap();
        lifecycle.advance(Phase::Serving).unwrap();

        let response = send_get(app(&config, lifecycle, Router::new()), "/ready").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"status":"serving"}"#);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_renders_text() {
        let config = ServiceConfig::default();
        let response = send_get(app(&config, Lifecycle::new(), Router::new()), "/metrics").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            handlers::PROMETHEUS_CONTENT_TYPE
        );
        assert!(body_string(response).await.contains("users_api_build_info"));
    }

    #[tokio::test]
    async fn test_custom_metrics_path() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_path = "/prometheus".into();

        let router = app(&config, Lifecycle::new(), Router::new());
        assert_eq!(send_get(router.clone(), "/prometheus").await.status(), StatusCode::OK);
        assert_eq!(send_get(router, "/metrics").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_info_reports_name_and_version() {
        let config = ServiceConfig::default();
        let response = send_get(app(&config, Lifecycle::new(), Router::new()), "/info").await;
        assert_eq!(response.status(), StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["name"], "users-api");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_embedder_routes_are_served() {
        let config = ServiceConfig::default();
        let routes = Router::new().route("/x", get(|| async { "x" }));

        let response = send_get(app(&config, Lifecycle::new(), routes), "/x").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "x");
    }

    #[tokio::test]
    async fn test_request_id_generated() {
        let config = ServiceConfig::default();
        let response = send_get(app(&config, Lifecycle::new(), Router::new()), "/health").await;

        let id = response.headers().get("x-request-id").expect("request id header");
        assert!(uuid::Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_request_id_preserved() {
        let config = ServiceConfig::default();
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "client-chosen")
            .body(Body::empty())
            .unwrap();

        let response = app(&config, Lifecycle::new(), Router::new())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.headers().get("x-request-id").unwrap(), "client-chosen");
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let config = ServiceConfig::default();
        let response = send_get(app(&config, Lifecycle::new(), Router::new()), "/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
