//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Install signal bridge → Coordinator::run → exit code
//!
//! Coordinator (coordinator.rs):
//!     Resolve Lifecycles group + Shutdown + AbortNotifier
//!     → start every component (registration order)
//!     → wait for the first trigger
//!     → stop every component (registration order)
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → Shutdown::trigger (once)
//!
//! Abort (abort.rs):
//!     Component fatal error → AbortNotifier::notify (first one wins)
//! ```
//!
//! # Design Decisions
//! - Start failures are logged per component; the rest still start
//! - Stop runs in registration order, not reverse dependency order
//! - No timeouts on start/stop; a hanging stop hangs shutdown
//! - Wiring failures stop whatever was already built, then surface to `main`

pub mod abort;
pub mod component;
pub mod coordinator;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use abort::AbortNotifier;
pub use component::{Lifecycle, Lifecycles};
pub use coordinator::{Coordinator, CoordinatorError, State, Termination};
pub use shutdown::Shutdown;
pub use signals::{SignalBridge, SignalError};
