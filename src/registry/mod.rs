//! Dependency registry subsystem.
//!
//! # Data Flow
//! ```text
//! Wiring (main / tests):
//!     provide / try_provide / provide_into / provide_instance
//!     → provider.rs (Slot: constructor + declared requirements + memo cell)
//!
//! Resolution:
//!     resolve::<T>() / resolve_group::<G>() / invoke(f)
//!     → graph.rs (walk declared requirements: missing provider? cycle?)
//!     → resolver.rs (construct lazily, depth first, memoize per slot)
//! ```
//!
//! # Design Decisions
//! - Providers are keyed by `TypeId`; inputs are declared by the constructor's
//!   argument type (`Arc<T>`, `Group<G>`, or tuples of those), never discovered
//!   by reflection
//! - Every slot is built at most once; concurrent first resolutions serialize on
//!   the slot's lock
//! - The declared graph is walked before anything is constructed, so a cycle is
//!   reported as an error instead of recursing or deadlocking
//! - Groups are keyed by a marker type implementing [`GroupTag`]; members keep
//!   registration order

pub mod dependency;
pub mod error;
mod graph;
mod provider;
pub mod resolver;

pub use dependency::{Dependencies, Dependency, Group, GroupTag, Requirement, TypeKey};
pub use error::{BoxError, WiringError};
pub use resolver::Resolver;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::lifecycle::{AbortNotifier, Shutdown};
use provider::{Instance, Slot};

/// Registry of providers, memoizing every value it constructs.
///
/// A fresh registry already holds the two termination triggers, [`Shutdown`]
/// and [`AbortNotifier`], so any constructor can declare them as inputs.
pub struct Registry {
    providers: DashMap<TypeKey, Arc<Slot>>,
    groups: DashMap<TypeKey, Vec<Arc<Slot>>>,
}

impl Registry {
    /// Create a registry holding the termination triggers.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.insert(Slot::instance::<Shutdown>(Shutdown::new()));
        registry.insert(Slot::instance::<AbortNotifier>(AbortNotifier::new()));
        registry
    }

    fn empty() -> Self {
        Self {
            providers: DashMap::new(),
            groups: DashMap::new(),
        }
    }

    /// Register an infallible constructor for `T`.
    pub fn provide<T, D, F>(&self, constructor: F) -> Result<(), WiringError>
    where
        T: Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> T + Send + Sync + 'static,
    {
        self.try_provide(move |deps: D| Ok::<_, std::convert::Infallible>(constructor(deps)))
    }

    /// Register a fallible constructor for `T`.
    ///
    /// Fails with [`WiringError::AmbiguousProvider`] if `T` already has a provider.
    pub fn try_provide<T, D, F, E>(&self, constructor: F) -> Result<(), WiringError>
    where
        T: Send + Sync + 'static,
        D: Dependencies,
        E: Into<BoxError> + 'static,
        F: Fn(D) -> Result<T, E> + Send + Sync + 'static,
    {
        let slot = Slot::new::<T, D, F, E>(constructor);
        match self.providers.entry(TypeKey::of::<T>()) {
            Entry::Occupied(_) => Err(WiringError::AmbiguousProvider {
                type_name: std::any::type_name::<T>(),
            }),
            Entry::Vacant(vacant) => {
                tracing::debug!(provider = slot.type_name, "provider registered");
                vacant.insert(Arc::new(slot));
                Ok(())
            }
        }
    }

    /// Register an already built value.
    pub fn provide_instance<T>(&self, value: T) -> Result<(), WiringError>
    where
        T: Send + Sync + 'static,
    {
        match self.providers.entry(TypeKey::of::<T>()) {
            Entry::Occupied(_) => Err(WiringError::AmbiguousProvider {
                type_name: std::any::type_name::<T>(),
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Slot::instance(value)));
                Ok(())
            }
        }
    }

    /// Register a constructor contributing one member to group `G`.
    ///
    /// Group members never conflict with each other, or with singletons.
    pub fn provide_into<G, D, F>(&self, constructor: F) -> Result<(), WiringError>
    where
        G: GroupTag,
        D: Dependencies,
        F: Fn(D) -> G::Item + Send + Sync + 'static,
    {
        let slot = Slot::new::<G::Item, D, _, std::convert::Infallible>(move |deps: D| {
            Ok(constructor(deps))
        });
        tracing::debug!(group = G::NAME, member = slot.type_name, "group member registered");
        self.groups
            .entry(TypeKey::of::<G>())
            .or_default()
            .push(Arc::new(slot));
        Ok(())
    }

    /// Resolve the singleton for `T`, constructing it and its inputs on first use.
    pub fn resolve<T>(&self) -> Result<Arc<T>, WiringError>
    where
        T: Send + Sync + 'static,
    {
        self.check(&[Requirement::Type(TypeKey::of::<T>())])?;
        Resolver::new(self).resolve::<T>()
    }

    /// Resolve every member of group `G`, in registration order.
    pub fn resolve_group<G: GroupTag>(&self) -> Result<Vec<G::Item>, WiringError> {
        self.check(&[Requirement::Group(TypeKey::of::<G>())])?;
        Resolver::new(self).resolve_group::<G>()
    }

    /// Members of group `G` whose values already exist, in registration order.
    ///
    /// A member that only projects already-built singletons counts as
    /// existing; no singleton is ever constructed here.
    pub fn constructed_group<G: GroupTag>(&self) -> Vec<G::Item> {
        let resolver = Resolver::new(self);
        self.members(&TypeKey::of::<G>())
            .iter()
            .filter_map(|slot| match slot.get() {
                Some(instance) => Some(instance),
                None if self.inputs_built(slot) => slot.get_or_construct(&resolver).ok(),
                None => None,
            })
            .filter_map(|instance| instance.downcast::<G::Item>().ok())
            .map(|item| (*item).clone())
            .collect()
    }

    /// Resolve the inputs `f` declares and call it.
    pub fn invoke<D, F, R>(&self, f: F) -> Result<R, WiringError>
    where
        D: Dependencies,
        F: FnOnce(D) -> R,
    {
        self.check(&D::requirements())?;
        let deps = D::resolve(&Resolver::new(self))?;
        Ok(f(deps))
    }

    /// Check that every registered provider's declared inputs are satisfiable
    /// and acyclic, without constructing anything.
    pub fn validate(&self) -> Result<(), WiringError> {
        let mut requirements: Vec<Requirement> = self
            .providers
            .iter()
            .map(|entry| Requirement::Type(*entry.key()))
            .collect();
        requirements.extend(self.groups.iter().map(|entry| Requirement::Group(*entry.key())));
        self.check(&requirements)
    }

    fn check(&self, requirements: &[Requirement]) -> Result<(), WiringError> {
        graph::Walk::new(self).check(requirements)
    }

    fn inputs_built(&self, slot: &Slot) -> bool {
        !slot.requirements.is_empty()
            && slot.requirements.iter().all(|requirement| match requirement {
                Requirement::Type(key) => self
                    .provider(key)
                    .is_some_and(|provider| provider.get().is_some()),
                Requirement::Group(_) => false,
            })
    }

    fn insert(&self, slot: Slot) {
        self.providers.insert(slot.key, Arc::new(slot));
    }

    pub(crate) fn provider(&self, key: &TypeKey) -> Option<Arc<Slot>> {
        self.providers.get(key).map(|slot| Arc::clone(slot.value()))
    }

    pub(crate) fn members(&self, key: &TypeKey) -> Vec<Arc<Slot>> {
        self.groups
            .get(key)
            .map(|members| members.value().clone())
            .unwrap_or_default()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn downcast<T>(instance: Instance, type_name: &'static str) -> Result<Arc<T>, WiringError>
where
    T: Send + Sync + 'static,
{
    instance
        .downcast::<T>()
        .map_err(|_| WiringError::TypeMismatch { type_name })
}
