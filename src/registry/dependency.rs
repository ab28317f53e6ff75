//! Declared constructor inputs.
//!
//! A constructor's argument type is its declaration: `Arc<T>` asks for the
//! singleton of `T`, `Group<G>` for every member of group `G`, and tuples of
//! those (including `()`) combine them.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::error::WiringError;
use super::resolver::Resolver;

/// Identifier of a type known at compile time, with its name for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// One declared input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// The singleton provider of a type.
    Type(TypeKey),
    /// Every member of a group, keyed by its tag type.
    Group(TypeKey),
}

/// Marker type naming a group of values of type `Item`.
pub trait GroupTag: 'static {
    const NAME: &'static str;
    type Item: Clone + Send + Sync + 'static;
}

/// All members of group `G`, in registration order.
pub struct Group<G: GroupTag>(pub Vec<G::Item>);

impl<G: GroupTag> fmt::Debug for Group<G>
where
    G::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(G::NAME).field(&self.0).finish()
    }
}

/// A single injectable input.
pub trait Dependency: Sized + 'static {
    fn requirement() -> Requirement;
    fn resolve(resolver: &Resolver<'_>) -> Result<Self, WiringError>;
}

impl<T> Dependency for Arc<T>
where
    T: Send + Sync + 'static,
{
    fn requirement() -> Requirement {
        Requirement::Type(TypeKey::of::<T>())
    }

    fn resolve(resolver: &Resolver<'_>) -> Result<Self, WiringError> {
        resolver.resolve::<T>()
    }
}

impl<G: GroupTag> Dependency for Group<G> {
    fn requirement() -> Requirement {
        Requirement::Group(TypeKey::of::<G>())
    }

    fn resolve(resolver: &Resolver<'_>) -> Result<Self, WiringError> {
        resolver.resolve_group::<G>().map(Group)
    }
}

/// The full set of inputs of a constructor or invoked function.
pub trait Dependencies: Sized + 'static {
    fn requirements() -> Vec<Requirement>;
    fn resolve(resolver: &Resolver<'_>) -> Result<Self, WiringError>;
}

impl Dependencies for () {
    fn requirements() -> Vec<Requirement> {
        Vec::new()
    }

    fn resolve(_resolver: &Resolver<'_>) -> Result<Self, WiringError> {
        Ok(())
    }
}

macro_rules! impl_dependencies {
    ($($name:ident),+) => {
        impl<$($name: Dependency),+> Dependencies for ($($name,)+) {
            fn requirements() -> Vec<Requirement> {
                vec![$($name::requirement()),+]
            }

            fn resolve(resolver: &Resolver<'_>) -> Result<Self, WiringError> {
                Ok(($($name::resolve(resolver)?,)+))
            }
        }
    };
}

impl_dependencies!(A);
impl_dependencies!(A, B);
impl_dependencies!(A, B, C);
impl_dependencies!(A, B, C, D);
impl_dependencies!(A, B, C, D, E);
impl_dependencies!(A, B, C, D, E, F);
impl_dependencies!(A, B, C, D, E, F, G);
impl_dependencies!(A, B, C, D, E, F, G, H);
