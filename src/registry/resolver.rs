//! Depth-first construction of declared inputs.

use std::cell::RefCell;
use std::sync::Arc;

use super::dependency::{GroupTag, TypeKey};
use super::error::WiringError;
use super::{downcast, Registry};

/// One resolution pass over the registry.
///
/// Tracks the chain of types currently under construction, so re-entering a
/// type is reported as a cycle instead of recursing.
pub struct Resolver<'r> {
    registry: &'r Registry,
    path: RefCell<Vec<TypeKey>>,
}

impl<'r> Resolver<'r> {
    pub(crate) fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            path: RefCell::new(Vec::new()),
        }
    }

    /// Resolve the singleton for `T`.
    pub fn resolve<T>(&self) -> Result<Arc<T>, WiringError>
    where
        T: Send + Sync + 'static,
    {
        let key = TypeKey::of::<T>();
        if let Some(cycle) = self.cycle_through(&key) {
            return Err(WiringError::Cycle { path: cycle });
        }

        let slot = self
            .registry
            .provider(&key)
            .ok_or_else(|| WiringError::MissingProvider {
                type_name: key.name(),
                required_by: self.path.borrow().last().map(TypeKey::name),
            })?;

        self.path.borrow_mut().push(key);
        let built = slot.get_or_construct(self);
        self.path.borrow_mut().pop();

        downcast::<T>(built?, key.name())
    }

    /// Resolve every member of group `G`, in registration order.
    pub fn resolve_group<G: GroupTag>(&self) -> Result<Vec<G::Item>, WiringError> {
        self.registry
            .members(&TypeKey::of::<G>())
            .iter()
            .map(|slot| {
                let instance = slot.get_or_construct(self)?;
                downcast::<G::Item>(instance, slot.type_name).map(|item| (*item).clone())
            })
            .collect()
    }

    fn cycle_through(&self, key: &TypeKey) -> Option<Vec<&'static str>> {
        let path = self.path.borrow();
        let start = path.iter().position(|entry| entry == key)?;
        let mut cycle: Vec<&'static str> = path[start..].iter().map(TypeKey::name).collect();
        cycle.push(key.name());
        Some(cycle)
    }
}
