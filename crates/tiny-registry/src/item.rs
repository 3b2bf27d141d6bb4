use serde::{Deserialize, Serialize};
use tiny_types::{Id, ReferenceKind, Version};

use crate::entity::{Entity, EntityGroup};
use crate::module::{Module, Script, System};
use crate::reference::Registered;
use crate::types::TinyType;

/// Any top-level object stored in a [`Registry`](crate::Registry).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RegistryObject {
    Type(TinyType),
    Entity(Entity),
    EntityGroup(EntityGroup),
    Module(Module),
    System(System),
    Script(Script),
}

impl RegistryObject {
    pub fn id(&self) -> Id {
        match self {
            RegistryObject::Type(o) => o.id(),
            RegistryObject::Entity(o) => o.id(),
            RegistryObject::EntityGroup(o) => o.id(),
            RegistryObject::Module(o) => o.id(),
            RegistryObject::System(o) => o.id(),
            RegistryObject::Script(o) => o.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RegistryObject::Type(o) => o.name(),
            RegistryObject::Entity(o) => o.name(),
            RegistryObject::EntityGroup(o) => o.name(),
            RegistryObject::Module(o) => o.name(),
            RegistryObject::System(o) => o.name(),
            RegistryObject::Script(o) => o.name(),
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        match self {
            RegistryObject::Type(_) => ReferenceKind::Type,
            RegistryObject::Entity(_) => ReferenceKind::Entity,
            RegistryObject::EntityGroup(_) => ReferenceKind::EntityGroup,
            RegistryObject::Module(_) => ReferenceKind::Module,
            RegistryObject::System(_) => ReferenceKind::System,
            RegistryObject::Script(_) => ReferenceKind::Script,
        }
    }

    /// Current version, including every owned sub-object.
    pub fn version(&self) -> Version {
        match self {
            RegistryObject::Type(o) => o.version(),
            RegistryObject::Entity(o) => o.version(),
            RegistryObject::EntityGroup(o) => o.version(),
            RegistryObject::Module(o) => o.version(),
            RegistryObject::System(o) => o.version(),
            RegistryObject::Script(o) => o.version(),
        }
    }

    /// Stamp a fresh version on the object itself.
    pub fn touch(&mut self) {
        match self {
            RegistryObject::Type(o) => o.touch(),
            RegistryObject::Entity(o) => o.touch(),
            RegistryObject::EntityGroup(o) => o.touch(),
            RegistryObject::Module(o) => o.touch(),
            RegistryObject::System(o) => o.touch(),
            RegistryObject::Script(o) => o.touch(),
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        match self {
            RegistryObject::Type(o) => o.set_name(name),
            RegistryObject::Entity(o) => o.set_name(name),
            RegistryObject::EntityGroup(o) => o.set_name(name),
            RegistryObject::Module(o) => o.set_name(name),
            RegistryObject::System(o) => o.set_name(name),
            RegistryObject::Script(o) => o.set_name(name),
        }
    }
}

macro_rules! impl_registered {
    ($ty:ident, $variant:ident, $kind:expr) => {
        impl Registered for $ty {
            const KIND: ReferenceKind = $kind;

            fn id(&self) -> Id {
                $ty::id(self)
            }

            fn name(&self) -> &str {
                $ty::name(self)
            }

            fn from_object(object: &RegistryObject) -> Option<&Self> {
                match object {
                    RegistryObject::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_object_mut(object: &mut RegistryObject) -> Option<&mut Self> {
                match object {
                    RegistryObject::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_object(self) -> RegistryObject {
                RegistryObject::$variant(self)
            }
        }

        impl From<$ty> for RegistryObject {
            fn from(value: $ty) -> Self {
                RegistryObject::$variant(value)
            }
        }
    };
}

impl_registered!(TinyType, Type, ReferenceKind::Type);
impl_registered!(Entity, Entity, ReferenceKind::Entity);
impl_registered!(EntityGroup, EntityGroup, ReferenceKind::EntityGroup);
impl_registered!(Module, Module, ReferenceKind::Module);
impl_registered!(System, System, ReferenceKind::System);
impl_registered!(Script, Script, ReferenceKind::Script);
