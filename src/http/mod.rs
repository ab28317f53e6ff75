//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, endpoints + middlewares, start/stop)
//!     → request.rs (assign/propagate x-request-id, CorrelationId extractor)
//!     → handler
//!     → response.rs (errors → {"errors": [...]} with matching status)
//!     → Send to client
//! ```

pub mod health;
pub mod request;
pub mod response;
pub mod server;

pub use health::{health_endpoint, HEALTH_PATH};
pub use request::{CorrelationId, MakeCorrelationId, X_REQUEST_ID};
pub use response::{encode_error, ErrorResponse, CONTENT_TYPE_JSON};
pub use server::{Endpoint, Endpoints, HttpServer, HttpServerError, Middleware, Middlewares};
