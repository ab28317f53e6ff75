//! Startup orchestration.
//!
//! # Responsibilities
//! - Install the signal bridge
//! - Run the coordinator as the process main loop
//! - Turn the outcome into the process exit code
//!
//! # Design Decisions
//! - Only this module and `main` decide to exit; everything else returns errors
//! - Wiring failures stop already-built components before exiting with 1

use std::process::ExitCode;

use super::coordinator::{Coordinator, Termination};
use super::shutdown::Shutdown;
use super::signals::SignalBridge;
use crate::registry::WiringError;

/// Run the service until shutdown and report how the process should exit.
pub async fn run(coordinator: &Coordinator) -> ExitCode {
    let shutdown = match coordinator.registry().resolve::<Shutdown>() {
        Ok(shutdown) => shutdown,
        Err(err) => return abort_wiring(coordinator, err).await,
    };

    let _bridge = match SignalBridge::install((*shutdown).clone()) {
        Ok(bridge) => bridge,
        Err(err) => {
            tracing::error!(error = %err, "failed to install signal bridge");
            coordinator.stop().await;
            return ExitCode::FAILURE;
        }
    };

    match coordinator.run().await {
        Ok(termination) => {
            tracing::info!(%termination, "shutdown complete");
            exit_code(&termination)
        }
        Err(err) => {
            tracing::error!(error = %err, "service failed to run");
            ExitCode::FAILURE
        }
    }
}

/// Handle a wiring failure: log it, stop whatever was already built, exit 1.
pub async fn abort_wiring(coordinator: &Coordinator, err: WiringError) -> ExitCode {
    tracing::error!(error = %err, "dependency wiring failed");
    coordinator.stop().await;
    ExitCode::FAILURE
}

fn exit_code(termination: &Termination) -> ExitCode {
    match termination {
        Termination::Abort(_) => ExitCode::FAILURE,
        Termination::Signal | Termination::Stopped => ExitCode::SUCCESS,
    }
}
