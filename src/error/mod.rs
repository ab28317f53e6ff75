//! Error taxonomy.
//!
//! # Data Flow
//! ```text
//! Handler failure
//!     → ServiceError   (domain rule broken, explicit status + field)
//!     → TransportError (edge failure, e.g. malformed request or upstream)
//!     → anything else  (generic, always 500)
//!     → object.rs: to_error_object(correlation id, err)
//!     → http/response.rs: {"errors": [ ... ]} on the wire
//! ```
//!
//! # Design Decisions
//! - Classification is by downcast, so any `dyn Error` can be mapped
//! - The wrapped cause is kept for diagnostics but never serialized

pub mod object;

pub use object::{to_error_object, ErrorObject, Payload, Source};

use axum::http::StatusCode;
use std::error::Error as StdError;
use std::fmt;

use crate::registry::BoxError;

/// Stable code and human readable message shared by both error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonError {
    pub code: String,
    pub message: String,
}

/// A business rule or domain failure.
#[derive(Debug)]
pub struct ServiceError {
    pub status: StatusCode,
    pub field: String,
    pub common: CommonError,
    cause: Option<BoxError>,
}

impl ServiceError {
    /// Wrap `err`, taking the message from it.
    pub fn new(
        err: impl Into<BoxError>,
        code: impl Into<String>,
        field: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        let cause = err.into();
        Self {
            status,
            field: field.into(),
            common: CommonError {
                code: code.into(),
                message: cause.to_string(),
            },
            cause: Some(cause),
        }
    }

    pub fn code(&self) -> &str {
        &self.common.code
    }

    pub fn message(&self) -> &str {
        &self.common.message
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} {}", self.field, self.common.message)
    }
}

impl StdError for ServiceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// A failure surfaced by the edge layer.
#[derive(Debug)]
pub struct TransportError {
    pub status: StatusCode,
    /// Offending request field; empty when the failure is not tied to one.
    pub field: String,
    pub common: CommonError,
    cause: Option<BoxError>,
}

impl TransportError {
    /// Wrap `err`, taking the message from it.
    pub fn new(
        err: impl Into<BoxError>,
        code: impl Into<String>,
        field: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        let cause = err.into();
        Self {
            status,
            field: field.into(),
            common: CommonError {
                code: code.into(),
                message: cause.to_string(),
            },
            cause: Some(cause),
        }
    }

    pub fn code(&self) -> &str {
        &self.common.code
    }

    pub fn message(&self) -> &str {
        &self.common.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} {}", self.field, self.common.message)
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn StdError + 'static))
    }
}
