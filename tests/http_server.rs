//! The HTTP server running under the coordinator, exercised over real sockets.

mod common;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Duration;

use common::wait_for_state;
use service_bootstrap::config::ServiceConfig;
use service_bootstrap::error::{ServiceError, TransportError};
use service_bootstrap::http::{
    CorrelationId, Endpoint, Endpoints, ErrorResponse, HttpServer, Middlewares, CONTENT_TYPE_JSON,
};
use service_bootstrap::lifecycle::{AbortNotifier, Coordinator, Shutdown, State, Termination};
use service_bootstrap::registry::{Group, Registry};

async fn signup(id: CorrelationId) -> Result<&'static str, ErrorResponse> {
    let err = ServiceError::new("email is required", "INVALID_EMAIL", "email", StatusCode::BAD_REQUEST);
    Err(ErrorResponse::new(&id, &err))
}

async fn upstream(id: CorrelationId) -> ErrorResponse {
    let err = TransportError::new("billing unavailable", "UPSTREAM", "", StatusCode::BAD_GATEWAY);
    ErrorResponse::new(&id, &err)
}

async fn boom(id: CorrelationId) -> ErrorResponse {
    let err = std::io::Error::other("boom");
    ErrorResponse::new(&id, &err)
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "late"
}

fn local_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.server.http_address = "127.0.0.1:0".into();
    config
}

fn wire(config: ServiceConfig) -> Arc<Registry> {
    let registry = Arc::new(Registry::new());
    registry.provide_instance(config).unwrap();
    registry.provide_monitoring_endpoints().unwrap();
    registry
        .provide_into::<Endpoints, _, _>(|()| Endpoint::new("/signup", post(signup)))
        .unwrap();
    registry
        .provide_into::<Endpoints, _, _>(|()| Endpoint::new("/upstream", get(upstream)))
        .unwrap();
    registry
        .provide_into::<Endpoints, _, _>(|()| Endpoint::new("/boom", get(boom)))
        .unwrap();
    registry
        .provide_into::<Endpoints, _, _>(|()| Endpoint::new("/slow", get(slow)))
        .unwrap();
    registry
        .provide_into::<Endpoints, _, _>(|()| {
            Endpoint::new("/echo", post(|body: Bytes| async move { body }))
        })
        .unwrap();
    registry
        .provide_component(
            |(config, Group(endpoints), Group(middlewares), abort): (
                Arc<ServiceConfig>,
                Group<Endpoints>,
                Group<Middlewares>,
                Arc<AbortNotifier>,
            )| {
                HttpServer::new(config.server.clone(), endpoints, middlewares)
                    .with_abort((*abort).clone())
            },
        )
        .unwrap();
    registry.validate().unwrap();
    registry
}

#[tokio::test]
async fn test_serves_health_and_errors_until_shutdown() {
    let registry = wire(local_config());
    let coordinator = Arc::new(Coordinator::new(registry.clone()));
    let run = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run().await })
    };
    wait_for_state(&coordinator, State::Running).await;

    let server = registry.resolve::<HttpServer>().unwrap();
    let addr = server.local_addr().await.expect("server not listening");
    let base = format!("http://{addr}");
    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let health = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    assert!(health.headers().contains_key("x-request-id"));
    assert!(health.bytes().await.unwrap().is_empty());

    let res = client
        .post(format!("{base}/signup"))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(res.headers()["content-type"], CONTENT_TYPE_JSON);
    assert_eq!(res.headers()["x-request-id"], "req-42");
    let payload: serde_json::Value = res.json().await.unwrap();
    let object = &payload["errors"][0];
    assert_eq!(object["id"], "req-42");
    assert_eq!(object["status"], 400);
    assert_eq!(object["code"], "INVALID_EMAIL");
    assert_eq!(object["source"]["field"], "email");
    assert_eq!(object["source"]["message"], "email is required");

    let res = client.get(format!("{base}/upstream")).send().await.unwrap();
    assert_eq!(res.status(), 502);
    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    let payload: serde_json::Value = res.json().await.unwrap();
    assert_eq!(payload["errors"][0]["id"], request_id.as_str());
    assert_eq!(payload["errors"][0]["detail"], "billing unavailable");
    assert!(payload["errors"][0].get("source").is_none());

    let res = client.get(format!("{base}/boom")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    let payload: serde_json::Value = res.json().await.unwrap();
    assert_eq!(payload["errors"][0]["code"], "boom");

    let res = client.get(format!("{base}/nowhere")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let payload: serde_json::Value = res.json().await.unwrap();
    assert_eq!(payload["errors"][0]["code"], "NOT_FOUND");

    registry.resolve::<Shutdown>().unwrap().trigger();
    let termination = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(matches!(termination, Termination::Signal));
    assert!(server.local_addr().await.is_none());

    let fresh = reqwest::Client::builder().no_proxy().build().unwrap();
    assert!(fresh.get(format!("{base}/health")).send().await.is_err());
}

async fn assert_error_payload(res: reqwest::Response, status: u16, code: &str) {
    assert_eq!(res.status(), status);
    assert_eq!(res.headers()["content-type"], CONTENT_TYPE_JSON);
    let request_id = res.headers()["x-request-id"].to_str().unwrap().to_string();
    let payload: serde_json::Value = res.json().await.unwrap();
    assert_eq!(payload["errors"][0]["status"], status);
    assert_eq!(payload["errors"][0]["code"], code);
    assert_eq!(payload["errors"][0]["id"], request_id.as_str());
}

#[tokio::test]
async fn test_edge_rejections_use_error_payload() {
    let mut config = local_config();
    config.server.request_timeout_secs = 1;
    config.server.max_body_bytes = 16;
    let registry = wire(config);
    let coordinator = Arc::new(Coordinator::new(registry.clone()));
    let run = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run().await })
    };
    wait_for_state(&coordinator, State::Running).await;

    let addr = registry
        .resolve::<HttpServer>()
        .unwrap()
        .local_addr()
        .await
        .expect("server not listening");
    let base = format!("http://{addr}");
    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let res = client.get(format!("{base}/signup")).send().await.unwrap();
    assert_error_payload(res, 405, "METHOD_NOT_ALLOWED").await;

    let res = client.get(format!("{base}/slow")).send().await.unwrap();
    assert_error_payload(res, 408, "REQUEST_TIMEOUT").await;

    let res = client
        .post(format!("{base}/echo"))
        .body(vec![b'x'; 1024])
        .send()
        .await
        .unwrap();
    assert_error_payload(res, 413, "PAYLOAD_TOO_LARGE").await;

    let res = client.post(format!("{base}/echo")).body("short").send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "short");

    registry.resolve::<Shutdown>().unwrap().trigger();
    let termination = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(matches!(termination, Termination::Signal));
}

#[tokio::test]
async fn test_bind_failure_does_not_block_shutdown() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = ServiceConfig::default();
    config.server.http_address = occupied.local_addr().unwrap().to_string();
    config.server.bind_attempts = 1;

    let registry = Arc::new(Registry::new());
    registry.provide_instance(config).unwrap();
    registry
        .provide_component(|(config,): (Arc<ServiceConfig>,)| {
            HttpServer::new(config.server.clone(), Vec::new(), Vec::new())
        })
        .unwrap();

    let coordinator = Arc::new(Coordinator::new(registry.clone()));
    let run = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run().await })
    };
    wait_for_state(&coordinator, State::Running).await;
    assert!(registry.resolve::<HttpServer>().unwrap().local_addr().await.is_none());

    coordinator.stop().await;
    let termination = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(matches!(termination, Termination::Stopped));
}
