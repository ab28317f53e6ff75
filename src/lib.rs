//! Service bootstrap toolkit.
//!
//! Wires components through a dependency registry, starts and stops them in a
//! coordinated sequence, turns OS signals into a graceful shutdown, and maps
//! internal errors onto a uniform JSON error payload.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod resilience;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{Coordinator, Lifecycle, Shutdown};
pub use registry::{Registry, WiringError};
