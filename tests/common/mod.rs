//! Shared utilities for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use service_bootstrap::lifecycle::{Coordinator, Lifecycle, State};
use service_bootstrap::registry::BoxError;

/// Ordered record of lifecycle calls across every probe.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Hang,
}

/// Test component. `ID` gives every probe its own type, so several can be
/// registered side by side.
pub struct Probe<const ID: usize> {
    journal: Journal,
    on_start: Behavior,
    on_stop: Behavior,
}

impl<const ID: usize> Probe<ID> {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            on_start: Behavior::Succeed,
            on_stop: Behavior::Succeed,
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.on_start = Behavior::Fail;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.on_stop = Behavior::Fail;
        self
    }

    pub fn hanging_stop(mut self) -> Self {
        self.on_stop = Behavior::Hang;
        self
    }

    async fn act(&self, phase: &str, behavior: Behavior) -> Result<(), BoxError> {
        self.journal.record(format!("{phase}:probe-{ID}"));
        match behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(format!("probe-{ID} cannot {phase}").into()),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl<const ID: usize> Lifecycle for Probe<ID> {
    fn name(&self) -> &'static str {
        "probe"
    }

    async fn start(&self) -> Result<(), BoxError> {
        self.act("start", self.on_start).await
    }

    async fn stop(&self) -> Result<(), BoxError> {
        self.act("stop", self.on_stop).await
    }
}

/// Wait until the coordinator reaches `state`, failing the test after 5s.
pub async fn wait_for_state(coordinator: &Coordinator, state: State) {
    let mut rx = coordinator.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|current| *current == state))
        .await
        .expect("timed out waiting for coordinator state")
        .expect("coordinator dropped");
}
