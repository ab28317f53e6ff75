//! The lifecycle contract and the group every component joins.

use async_trait::async_trait;
use std::sync::Arc;

use crate::registry::{BoxError, Dependencies, GroupTag, Registry, WiringError};

/// A component the coordinator starts and stops.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Begin doing work. Must return once the work is initiated.
    async fn start(&self) -> Result<(), BoxError>;

    /// Release resources. Must tolerate being called without a prior start.
    async fn stop(&self) -> Result<(), BoxError>;
}

/// Group of every registered [`Lifecycle`] component.
pub struct Lifecycles;

impl GroupTag for Lifecycles {
    const NAME: &'static str = "lifecycle";
    type Item = Arc<dyn Lifecycle>;
}

impl Registry {
    /// Register `T` as a singleton and as a member of [`Lifecycles`].
    pub fn provide_component<T, D, F>(&self, constructor: F) -> Result<(), WiringError>
    where
        T: Lifecycle + 'static,
        D: Dependencies,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        self.provide(constructor)?;
        self.join_lifecycle_group::<T>()
    }

    /// Fallible variant of [`Registry::provide_component`].
    pub fn try_provide_component<T, D, F, E>(&self, constructor: F) -> Result<(), WiringError>
    where
        T: Lifecycle + 'static,
        D: Dependencies,
        E: Into<BoxError> + 'static,
        F: Fn(D) -> Result<T, E> + Send + Sync + 'static,
    {
        self.try_provide(constructor)?;
        self.join_lifecycle_group::<T>()
    }

    fn join_lifecycle_group<T: Lifecycle + 'static>(&self) -> Result<(), WiringError> {
        self.provide_into::<Lifecycles, _, _>(|(component,): (Arc<T>,)| {
            component as Arc<dyn Lifecycle>
        })
    }
}
