//! Liveness endpoint.

use axum::http::StatusCode;
use axum::routing::get;

use super::server::{Endpoint, Endpoints};
use crate::registry::{Registry, WiringError};

pub const HEALTH_PATH: &str = "/health";

/// `GET /health`: 200 with no body while the process is alive.
pub fn health_endpoint() -> Endpoint {
    Endpoint::new(HEALTH_PATH, get(health))
}

async fn health() -> StatusCode {
    tracing::debug!("service is healthy");
    StatusCode::OK
}

impl Registry {
    /// Register the monitoring endpoints into the [`Endpoints`] group.
    pub fn provide_monitoring_endpoints(&self) -> Result<(), WiringError> {
        self.provide_into::<Endpoints, _, _>(|()| health_endpoint())
    }
}
