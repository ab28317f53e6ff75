//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Operation that may be retried (e.g. binding the HTTP listener):
//!     → attempt fails
//!     → backoff.rs: delay(attempt)
//!     → sleep, try again
//! ```
//!
//! # Design Decisions
//! - Backoff is a pure function; callers own the retry loop
//! - No jitter: the delay for an attempt is deterministic

pub mod backoff;

pub use backoff::delay;
