//! Typed weak references.
//!
//! A [`Reference<T>`] names a registry object by [`Id`] and caches the name it
//! had when the reference was taken. It never owns its target: resolution
//! goes through the [`Registry`] every time, so a deleted target simply stops
//! resolving.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tiny_types::{Id, ObjectRef, ReferenceKind};

use crate::item::RegistryObject;
use crate::registry::Registry;

/// A concrete object type that can live in a [`Registry`].
///
/// Implemented by every variant payload of [`RegistryObject`].
pub trait Registered: Sized {
    /// The reference kind naming this type.
    const KIND: ReferenceKind;

    fn id(&self) -> Id;

    fn name(&self) -> &str;

    /// Borrow the payload out of a registry slot, if it has this kind.
    fn from_object(object: &RegistryObject) -> Option<&Self>;

    /// Mutably borrow the payload out of a registry slot, if it has this kind.
    fn from_object_mut(object: &mut RegistryObject) -> Option<&mut Self>;

    /// Wrap into the registry slot type.
    fn into_object(self) -> RegistryObject;

    /// A weak reference to this object.
    fn reference(&self) -> Reference<Self> {
        Reference::new(self.id(), self.name())
    }
}

/// Weak, serializable handle to a registry object of type `T`.
///
/// Equality and hashing consider the id only; the cached name is for display.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Reference<T> {
    id: Id,
    name: String,
    #[serde(skip)]
    marker: PhantomData<fn() -> T>,
}

impl<T> Reference<T> {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            marker: PhantomData,
        }
    }

    /// A reference that resolves to nothing.
    pub fn null() -> Self {
        Self::new(Id::nil(), "")
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// The name cached when the reference was taken or last refreshed.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_null(&self) -> bool {
        self.id.is_nil()
    }
}

impl<T: Registered> Reference<T> {
    /// Resolve against a registry. `None` if the target is gone or has a
    /// different kind.
    pub fn dereference<'r>(&self, registry: &'r Registry) -> Option<&'r T> {
        registry.find_by_id::<T>(self.id)
    }

    pub fn dereference_mut<'r>(&self, registry: &'r mut Registry) -> Option<&'r mut T> {
        registry.find_by_id_mut::<T>(self.id)
    }

    /// Update the cached name from the live target. Returns `false` if the
    /// target does not resolve; the stale name is kept in that case.
    pub fn refresh(&mut self, registry: &Registry) -> bool {
        match self.dereference(registry) {
            Some(target) => {
                if self.name != target.name() {
                    self.name = target.name().to_string();
                }
                true
            }
            None => false,
        }
    }

    /// The untyped form stored in object values and snapshot records.
    pub fn to_object_ref(&self) -> ObjectRef {
        ObjectRef::new(T::KIND, self.id, self.name.clone())
    }

    /// Narrow an untyped reference. `None` if its kind does not match `T`.
    pub fn from_object_ref(r: &ObjectRef) -> Option<Self> {
        (r.kind == T::KIND).then(|| Self::new(r.id, r.name.clone()))
    }
}

impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self::new(self.id, self.name.clone())
    }
}

impl<T> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Reference<T> {}

impl<T> Hash for Reference<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> Default for Reference<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reference({}, {:?})", self.id.short_hex(), self.name)
    }
}
