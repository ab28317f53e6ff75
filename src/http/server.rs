//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router from the registered endpoints
//! - Wire up middleware (registered ones, then tracing, limits, request ID)
//! - Answer every edge rejection (404, 405, 408, 413, ...) with the JSON error payload
//! - Bind the listener, retrying with backoff
//! - Serve in the background between `start` and `stop`
//! - Report a server that dies after start through the abort notifier

use async_trait::async_trait;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, Route};
use axum::Router;
use std::collections::HashSet;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tower::{Layer, Service};
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::request::{CorrelationId, MakeCorrelationId};
use super::response::ErrorResponse;
use crate::config::ServerConfig;
use crate::error::TransportError;
use crate::lifecycle::{AbortNotifier, Lifecycle};
use crate::registry::{BoxError, GroupTag};
use crate::resilience::backoff;

/// A route pattern and the handler serving it.
#[derive(Clone)]
pub struct Endpoint {
    pub pattern: String,
    pub handler: MethodRouter,
}

impl Endpoint {
    pub fn new(pattern: impl Into<String>, handler: MethodRouter) -> Self {
        Self {
            pattern: pattern.into(),
            handler,
        }
    }
}

/// A request-handling middleware, applied to the router in registration order.
#[derive(Clone)]
pub struct Middleware(Arc<dyn Fn(Router) -> Router + Send + Sync>);

impl Middleware {
    pub fn new(apply: impl Fn(Router) -> Router + Send + Sync + 'static) -> Self {
        Self(Arc::new(apply))
    }

    /// Wrap a tower layer.
    pub fn layer<L>(layer: L) -> Self
    where
        L: Layer<Route> + Clone + Send + Sync + 'static,
        L::Service: Service<Request> + Clone + Send + Sync + 'static,
        <L::Service as Service<Request>>::Response: IntoResponse + 'static,
        <L::Service as Service<Request>>::Error: Into<Infallible> + 'static,
        <L::Service as Service<Request>>::Future: Send + 'static,
    {
        Self::new(move |router| router.layer(layer.clone()))
    }

    fn apply(&self, router: Router) -> Router {
        (self.0)(router)
    }
}

/// Group of endpoints served by [`HttpServer`].
pub struct Endpoints;

impl GroupTag for Endpoints {
    const NAME: &'static str = "endpoints";
    type Item = Endpoint;
}

/// Group of middlewares applied by [`HttpServer`].
pub struct Middlewares;

impl GroupTag for Middlewares {
    const NAME: &'static str = "middlewares";
    type Item = Middleware;
}

#[derive(Debug, Error)]
pub enum HttpServerError {
    #[error("failed to bind {address} after {attempts} attempt(s): {source}")]
    Bind {
        address: String,
        attempts: u32,
        source: std::io::Error,
    },
}

struct Running {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// HTTP server satisfying the lifecycle contract.
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
    abort: Option<AbortNotifier>,
    running: Mutex<Option<Running>>,
}

impl HttpServer {
    /// Create a new HTTP server from endpoints and middlewares.
    pub fn new(config: ServerConfig, endpoints: Vec<Endpoint>, middlewares: Vec<Middleware>) -> Self {
        let router = Self::build_router(&config, endpoints, &middlewares);
        Self {
            config,
            router,
            abort: None,
            running: Mutex::new(None),
        }
    }

    /// Deposit serve failures after start on `abort`.
    pub fn with_abort(mut self, abort: AbortNotifier) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, endpoints: Vec<Endpoint>, middlewares: &[Middleware]) -> Router {
        let mut router = Router::new();
        let mut patterns = HashSet::new();

        for endpoint in endpoints {
            if endpoint.pattern.is_empty() {
                continue;
            }
            if !endpoint.pattern.starts_with('/') {
                tracing::error!(pattern = %endpoint.pattern, "invalid routing pattern, must begin with '/'");
                continue;
            }
            if !patterns.insert(endpoint.pattern.clone()) {
                tracing::error!(pattern = %endpoint.pattern, "duplicate routing pattern, keeping the first");
                continue;
            }
            router = router.route(&endpoint.pattern, endpoint.handler);
        }

        // Fallbacks first, so registered middlewares also wrap unmatched requests.
        router = router
            .fallback(not_found)
            .method_not_allowed_fallback(method_not_allowed);

        for middleware in middlewares {
            router = middleware.apply(router);
        }

        router
            .layer(DefaultBodyLimit::max(config.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(axum::middleware::map_response(error_payload))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeCorrelationId))
    }

    /// Address actually bound, while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|running| running.local_addr)
    }

    async fn bind(&self) -> Result<TcpListener, HttpServerError> {
        let address = &self.config.http_address;
        let attempts = self.config.bind_attempts.max(1);
        let mut attempt = 0;

        loop {
            match TcpListener::bind(address).await {
                Ok(listener) => return Ok(listener),
                Err(err) if attempt + 1 < attempts => {
                    let wait = backoff::delay(attempt);
                    tracing::warn!(address = %address, attempt, delay = ?wait, error = %err, "bind failed, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(HttpServerError::Bind {
                        address: address.clone(),
                        attempts,
                        source: err,
                    })
                }
            }
        }
    }
}

#[async_trait]
impl Lifecycle for HttpServer {
    fn name(&self) -> &'static str {
        "http-server"
    }

    async fn start(&self) -> Result<(), BoxError> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(());
        }

        let listener = self.bind().await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = self.router.clone();
        let abort = self.abort.clone();

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(err) = served {
                tracing::error!(address = %local_addr, error = %err, "http server listen and serve");
                if let Some(abort) = abort {
                    abort.notify(err);
                }
            }
        });

        tracing::info!(address = %local_addr, "http server is started successfully");
        *running = Some(Running {
            local_addr,
            shutdown: shutdown_tx,
            task,
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), BoxError> {
        let Some(running) = self.running.lock().await.take() else {
            return Ok(());
        };

        // The serve task may already be gone; then there is nothing to signal.
        let _ = running.shutdown.send(());
        running.task.await?;
        tracing::info!(address = %running.local_addr, "http server is stopped successfully");
        Ok(())
    }
}

async fn not_found(id: CorrelationId, uri: Uri) -> ErrorResponse {
    let err = TransportError::new(
        format!("no route for {}", uri.path()),
        "NOT_FOUND",
        "",
        StatusCode::NOT_FOUND,
    );
    ErrorResponse::new(&id, &err)
}

async fn method_not_allowed(id: CorrelationId, method: Method, uri: Uri) -> ErrorResponse {
    let err = TransportError::new(
        format!("method {method} not allowed for {}", uri.path()),
        "METHOD_NOT_ALLOWED",
        "",
        StatusCode::METHOD_NOT_ALLOWED,
    );
    ErrorResponse::new(&id, &err)
}

/// Rewrite error responses that carry no JSON payload, such as the ones
/// produced by the timeout layer and body extractors.
async fn error_payload(id: CorrelationId, response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let reason = status.canonical_reason().unwrap_or("Request Failed");
    let code = reason.to_ascii_uppercase().replace([' ', '-'], "_");
    ErrorResponse::new(&id, &TransportError::new(reason, code, "", status)).into_response()
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    fn router(endpoints: Vec<Endpoint>, middlewares: Vec<Middleware>) -> Router {
        HttpServer::build_router(&ServerConfig::default(), endpoints, &middlewares)
    }

    async fn status(router: &Router, path: &str) -> StatusCode {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        router.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_invalid_patterns_are_skipped() {
        let router = router(
            vec![
                Endpoint::new("", get(|| async { "empty" })),
                Endpoint::new("ping", get(|| async { "relative" })),
                Endpoint::new("/ping", get(|| async { "pong" })),
                Endpoint::new("/ping", get(|| async { "duplicate" })),
            ],
            Vec::new(),
        );

        assert_eq!(status(&router, "/ping").await, StatusCode::OK);
        assert_eq!(status(&router, "/missing").await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_request_id_assigned_and_propagated() {
        let router = router(vec![Endpoint::new("/ping", get(|| async { "pong" }))], Vec::new());

        let request = Request::builder().uri("/ping").body(Body::empty()).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));

        let request = Request::builder()
            .uri("/ping")
            .header("x-request-id", "client-chosen")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "client-chosen");
    }

    #[tokio::test]
    async fn test_middlewares_applied() {
        let teapot = Middleware::new(|router: Router| {
            router.route_layer(axum::middleware::from_fn(
                |_request: Request, _next: axum::middleware::Next| async { StatusCode::IM_A_TEAPOT },
            ))
        });
        let router = router(vec![Endpoint::new("/ping", get(|| async { "pong" }))], vec![teapot]);
        assert_eq!(status(&router, "/ping").await, StatusCode::IM_A_TEAPOT);
    }

    async fn tag_response(request: Request, next: axum::middleware::Next) -> Response {
        let mut response = next.run(request).await;
        response
            .headers_mut()
            .insert("x-served-by", axum::http::HeaderValue::from_static("bootstrap"));
        response
    }

    #[tokio::test]
    async fn test_layer_middleware_wraps_fallbacks() {
        let tagging = Middleware::layer(axum::middleware::from_fn(tag_response));
        let router = router(vec![Endpoint::new("/ping", get(|| async { "pong" }))], vec![tagging]);

        for (method, path, expected) in [
            ("GET", "/ping", StatusCode::OK),
            ("GET", "/missing", StatusCode::NOT_FOUND),
            ("DELETE", "/ping", StatusCode::METHOD_NOT_ALLOWED),
        ] {
            let request = Request::builder().method(method).uri(path).body(Body::empty()).unwrap();
            let response = router.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), expected, "{method} {path}");
            assert_eq!(response.headers()["x-served-by"], "bootstrap", "{method} {path}");
        }
    }

    #[tokio::test]
    async fn test_bare_rejections_rewritten_as_payloads() {
        let config = ServerConfig {
            max_body_bytes: 8,
            ..ServerConfig::default()
        };
        let echo = axum::routing::post(|body: axum::body::Bytes| async move { body });
        let router = HttpServer::build_router(&config, vec![Endpoint::new("/echo", echo)], &[]);

        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .header("x-request-id", "req-413")
            .body(Body::from(vec![b'x'; 64]))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[header::CONTENT_TYPE], crate::http::CONTENT_TYPE_JSON);
        assert_eq!(response.headers()["x-request-id"], "req-413");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["errors"][0]["id"], "req-413");
        assert_eq!(payload["errors"][0]["status"], 413);
        assert_eq!(payload["errors"][0]["code"], "PAYLOAD_TOO_LARGE");

        let request = Request::builder()
            .method("POST")
            .uri("/echo")
            .body(Body::from("tiny"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let config = ServerConfig {
            http_address: "127.0.0.1:0".into(),
            ..ServerConfig::default()
        };
        let server = HttpServer::new(config, Vec::new(), Vec::new());

        server.stop().await.unwrap();
        server.start().await.unwrap();
        let addr = server.local_addr().await.unwrap();
        server.start().await.unwrap();
        assert_eq!(server.local_addr().await, Some(addr));

        server.stop().await.unwrap();
        server.stop().await.unwrap();
        assert!(server.local_addr().await.is_none());
    }

    #[tokio::test]
    async fn test_bind_failure_reported() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            http_address: occupied.local_addr().unwrap().to_string(),
            bind_attempts: 2,
            ..ServerConfig::default()
        };
        let server = HttpServer::new(config, Vec::new(), Vec::new());

        let err = server.start().await.unwrap_err();
        assert!(err.to_string().contains("after 2 attempt(s)"));
        assert!(server.local_addr().await.is_none());
    }
}
