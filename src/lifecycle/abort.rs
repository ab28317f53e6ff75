//! Abort notifier: a single-slot mailbox for fatal runtime errors.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::registry::BoxError;

/// Secondary termination trigger.
///
/// Any component may deposit a fatal error. The slot holds one error; while
/// it is occupied further deposits are dropped, so only the first failure
/// drives the shutdown.
#[derive(Clone)]
pub struct AbortNotifier {
    tx: mpsc::Sender<BoxError>,
    rx: Arc<Mutex<mpsc::Receiver<BoxError>>>,
}

impl AbortNotifier {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Deposit a fatal error without blocking.
    ///
    /// Returns `false` if an earlier error is still pending.
    pub fn notify(&self, err: impl Into<BoxError>) -> bool {
        match self.tx.try_send(err.into()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                tracing::warn!(error = %dropped, "abort already pending, dropping error");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Wait for the first deposited error.
    pub async fn wait(&self) -> BoxError {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(err) => err,
            // Unreachable while `self` holds the sender.
            None => std::future::pending().await,
        }
    }
}

impl Default for AbortNotifier {
    fn default() -> Self {
        Self::new()
    }
}
