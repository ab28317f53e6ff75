//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT (terminal) and SIGTERM (orchestrator) handlers
//! - Fire the [`Shutdown`] trigger on whichever arrives first
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - One bridge per process; a second `install` fails
//! - Signals after the first are not handled specially

use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::task::JoinHandle;

use super::shutdown::Shutdown;

static INSTALLED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("a signal bridge is already installed in this process")]
    AlreadyInstalled,

    #[error("failed to register signal handler: {0}")]
    Register(#[from] std::io::Error),
}

/// Owner of the process's termination signal subscription.
pub struct SignalBridge {
    task: JoinHandle<()>,
}

impl SignalBridge {
    /// Register the handlers and fire `shutdown` on the first signal.
    ///
    /// Handlers are registered before this returns. Must be called from
    /// within a Tokio runtime.
    pub fn install(shutdown: Shutdown) -> Result<Self, SignalError> {
        if INSTALLED.swap(true, Ordering::SeqCst) {
            return Err(SignalError::AlreadyInstalled);
        }

        let listener = match Listener::register() {
            Ok(listener) => listener,
            Err(err) => {
                INSTALLED.store(false, Ordering::SeqCst);
                return Err(err.into());
            }
        };

        let task = tokio::spawn(async move {
            let signal = listener.recv().await;
            tracing::info!(signal, "termination signal received");
            shutdown.trigger();
        });
        tracing::debug!("signal bridge installed");

        Ok(Self { task })
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(unix)]
struct Listener {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Listener {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

#[cfg(not(unix))]
struct Listener;

#[cfg(not(unix))]
impl Listener {
    fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(self) -> &'static str {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        "ctrl-c"
    }
}
