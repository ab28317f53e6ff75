//! Error responses.
//!
//! # Responsibilities
//! - Map errors to the `{"errors": [...]}` payload
//! - Use the error object's status as the HTTP status
//!
//! # Design Decisions
//! - Content type is always `application/json; charset=utf-8`
//! - Unknown errors become 500 rather than failing the request twice

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::error::Error as StdError;

use super::request::CorrelationId;
use crate::error::{to_error_object, ErrorObject, Payload};
use crate::observability::metrics;

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

/// An error ready to be written to the client.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    object: ErrorObject,
}

impl ErrorResponse {
    pub fn new(id: &CorrelationId, err: &(dyn StdError + 'static)) -> Self {
        Self {
            object: to_error_object(id.as_str(), err),
        }
    }

    pub fn object(&self) -> &ErrorObject {
        &self.object
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.object.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(request_id = %self.object.id, code = %self.object.code, "request failed");
        } else {
            tracing::debug!(request_id = %self.object.id, code = %self.object.code, "request rejected");
        }
        metrics::record_error_response(status.as_u16());

        match serde_json::to_vec(&Payload::from(self.object)) {
            Ok(body) => (status, [(header::CONTENT_TYPE, CONTENT_TYPE_JSON)], body).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "failed to encode error payload");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Encode `err` as a JSON error response.
pub fn encode_error(id: &CorrelationId, err: &(dyn StdError + 'static)) -> Response {
    ErrorResponse::new(id, err).into_response()
}
