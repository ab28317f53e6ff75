//! Request correlation.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) when the client sent none
//! - Expose it to handlers as [`CorrelationId`]
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A missing or unreadable ID degrades to an empty string, never a rejection

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Request};
use std::convert::Infallible;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeCorrelationId;

impl MakeRequestId for MakeCorrelationId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request's correlation id, empty if absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let id = headers
            .get(X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CorrelationId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
