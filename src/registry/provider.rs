//! Provider slots: a constructor, its declared requirements, and the memoized value.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::dependency::{Dependencies, Requirement, TypeKey};
use super::error::{BoxError, WiringError};
use super::resolver::Resolver;

pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

type Constructor = Box<dyn Fn(&Resolver<'_>) -> Result<Instance, WiringError> + Send + Sync>;

pub(crate) struct Slot {
    pub(crate) key: TypeKey,
    pub(crate) type_name: &'static str,
    pub(crate) requirements: Vec<Requirement>,
    constructor: Option<Constructor>,
    /// Held for the whole construction so concurrent first resolutions wait.
    instance: Mutex<Option<Instance>>,
}

impl Slot {
    pub(crate) fn new<T, D, F, E>(constructor: F) -> Self
    where
        T: Send + Sync + 'static,
        D: Dependencies,
        E: Into<BoxError> + 'static,
        F: Fn(D) -> Result<T, E> + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        let constructor: Constructor = Box::new(move |resolver: &Resolver<'_>| {
            let deps = D::resolve(resolver)?;
            let value = constructor(deps).map_err(|err| WiringError::Constructor {
                type_name,
                source: err.into(),
            })?;
            Ok(Arc::new(value) as Instance)
        });

        Self {
            key: TypeKey::of::<T>(),
            type_name,
            requirements: D::requirements(),
            constructor: Some(constructor),
            instance: Mutex::new(None),
        }
    }

    pub(crate) fn instance<T>(value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            key: TypeKey::of::<T>(),
            type_name: std::any::type_name::<T>(),
            requirements: Vec::new(),
            constructor: None,
            instance: Mutex::new(Some(Arc::new(value) as Instance)),
        }
    }

    /// The memoized value, if already built.
    pub(crate) fn get(&self) -> Option<Instance> {
        self.lock().clone()
    }

    pub(crate) fn get_or_construct(&self, resolver: &Resolver<'_>) -> Result<Instance, WiringError> {
        let mut instance = self.lock();
        if let Some(existing) = instance.as_ref() {
            return Ok(existing.clone());
        }

        let constructor = self
            .constructor
            .as_ref()
            .ok_or(WiringError::TypeMismatch {
                type_name: self.type_name,
            })?;
        let built = constructor(resolver)?;
        tracing::debug!(provider = self.type_name, "provider constructed");
        *instance = Some(built.clone());
        Ok(built)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instance>> {
        self.instance.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
