//! Lifecycle coordinator.
//!
//! # States
//! ```text
//! Idle → Starting → Running → Stopping → Stopped
//!   └──────────┴─────────┴──→ Stopping (direct stop())
//! ```
//!
//! Exactly one caller wins the transition into `Stopping`; that caller runs
//! the stop pass, so every component is stopped once.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;

use super::abort::AbortNotifier;
use super::component::{Lifecycle, Lifecycles};
use super::shutdown::Shutdown;
use crate::observability::metrics;
use crate::registry::{BoxError, Group, Registry, WiringError};

/// Coordinator state, ordered by progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Why [`Coordinator::run`] returned.
#[derive(Debug)]
pub enum Termination {
    /// The shutdown trigger fired.
    Signal,
    /// A component deposited a fatal error.
    Abort(BoxError),
    /// [`Coordinator::stop`] was called directly.
    Stopped,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Signal => write!(f, "signal"),
            Termination::Abort(err) => write!(f, "abort: {err}"),
            Termination::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("coordinator cannot run from state {0:?}")]
    AlreadyStarted(State),

    #[error(transparent)]
    Wiring(#[from] WiringError),
}

/// Starts every [`Lifecycle`] component, waits for a termination trigger,
/// then stops them.
pub struct Coordinator {
    registry: Arc<Registry>,
    state: watch::Sender<State>,
    components: Mutex<Vec<Arc<dyn Lifecycle>>>,
}

impl Coordinator {
    pub fn new(registry: Arc<Registry>) -> Self {
        let (state, _) = watch::channel(State::Idle);
        Self {
            registry,
            state,
            components: Mutex::new(Vec::new()),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn state(&self) -> State {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<State> {
        self.state.subscribe()
    }

    /// Start every component and block until a trigger fires and every
    /// component has been stopped.
    pub async fn run(&self) -> Result<Termination, CoordinatorError> {
        self.transition(&[State::Idle], State::Starting)
            .map_err(CoordinatorError::AlreadyStarted)?;

        let wired = self.registry.invoke(
            |(Group(components), shutdown, abort): (
                Group<Lifecycles>,
                Arc<Shutdown>,
                Arc<AbortNotifier>,
            )| (components, shutdown, abort),
        );
        let (components, shutdown, abort) = match wired {
            Ok(wired) => wired,
            Err(err) => {
                tracing::error!(error = %err, "lifecycle wiring failed");
                self.stop().await;
                return Err(err.into());
            }
        };
        *self.lock_components() = components.clone();

        tracing::info!(components = components.len(), "lifecycle coordinator is starting up");
        for component in &components {
            if self.state() != State::Starting {
                break;
            }
            match component.start().await {
                Ok(()) => {
                    tracing::info!(component = component.name(), "component started");
                    metrics::record_component_start(component.name(), true);
                }
                Err(err) => {
                    tracing::error!(component = component.name(), error = %err, "component failed to start");
                    metrics::record_component_start(component.name(), false);
                }
            }
        }

        if self.transition(&[State::Starting], State::Running).is_ok() {
            crate::notice!("lifecycle coordinator is running");

            let termination = tokio::select! {
                _ = shutdown.wait() => Some(Termination::Signal),
                err = abort.wait() => Some(Termination::Abort(err)),
                _ = self.wait_for(|state| state >= State::Stopping) => None,
            };

            if let Some(termination) = termination {
                if self.transition(&[State::Running], State::Stopping).is_ok() {
                    match &termination {
                        Termination::Abort(err) => {
                            tracing::error!(error = %err, "abort requested, stopping components")
                        }
                        _ => tracing::info!("shutdown signal received, stopping components"),
                    }
                    self.stop_components(&components).await;
                    self.finish();
                    return Ok(termination);
                }
            }
        }

        // Someone else called stop(); wait for their pass to complete.
        self.wait_for(|state| state == State::Stopped).await;
        Ok(Termination::Stopped)
    }

    /// Stop every component without waiting for a trigger.
    ///
    /// No-op once stopping has begun. Before `run` has resolved the group,
    /// only components that were already constructed are stopped.
    pub async fn stop(&self) {
        let previous = match self.transition(
            &[State::Idle, State::Starting, State::Running],
            State::Stopping,
        ) {
            Ok(previous) => previous,
            Err(_) => return,
        };

        let mut components = self.lock_components().clone();
        if components.is_empty() {
            components = self.registry.constructed_group::<Lifecycles>();
        }
        tracing::info!(from = ?previous, components = components.len(), "lifecycle coordinator stop requested");

        self.stop_components(&components).await;
        self.finish();
    }

    async fn stop_components(&self, components: &[Arc<dyn Lifecycle>]) {
        for component in components {
            match component.stop().await {
                Ok(()) => {
                    tracing::info!(component = component.name(), "component stopped");
                    metrics::record_component_stop(component.name(), true);
                }
                Err(err) => {
                    tracing::error!(component = component.name(), error = %err, "component failed to stop");
                    metrics::record_component_stop(component.name(), false);
                }
            }
        }
    }

    fn finish(&self) {
        self.state.send_replace(State::Stopped);
        tracing::info!("lifecycle coordinator cleanup is done");
    }

    /// Move to `to` if the current state is one of `from`.
    ///
    /// Returns the previous state, or the current one if it did not match.
    fn transition(&self, from: &[State], to: State) -> Result<State, State> {
        let mut outcome = Err(to);
        self.state.send_if_modified(|state| {
            if from.contains(state) {
                outcome = Ok(*state);
                *state = to;
                true
            } else {
                outcome = Err(*state);
                false
            }
        });
        outcome
    }

    async fn wait_for(&self, predicate: impl Fn(State) -> bool) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|state| predicate(*state)).await;
    }

    fn lock_components(&self) -> MutexGuard<'_, Vec<Arc<dyn Lifecycle>>> {
        self.components.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
