//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, trace..fatal)
//!     → metrics.rs (lifecycle and error counters)
//!
//! Consumers:
//!     → stdout (text or JSON lines)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows into error payloads
//! - Metrics are cheap (atomic increments); the exporter is optional

pub mod logging;
pub mod metrics;
