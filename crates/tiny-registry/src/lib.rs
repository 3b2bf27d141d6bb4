//! Schema-driven object model for Tiny.
//!
//! A [`Registry`] owns every top-level object: [`TinyType`] descriptors,
//! [`Entity`]s with their component [`Object`]s, [`EntityGroup`]s,
//! [`Module`]s, [`System`]s and [`Script`]s. Objects refer to each other
//! through weak, id-based [`Reference`]s.
//!
//! An [`Object`] is a dynamic property bag whose shape comes from its type at
//! runtime. It stores explicit overrides only; every other field resolves
//! through the type's default value and then the field type's own default.

pub mod builtin;
pub mod config;
pub mod entity;
pub mod error;
pub mod item;
pub mod module;
pub mod object;
pub mod reference;
pub mod registry;
pub mod types;
pub mod value;

pub use builtin::BuiltinType;
pub use config::RegistryConfig;
pub use entity::{Entity, EntityGroup};
pub use error::{ConsistencyViolation, RegistryError, RegistryResult, SchemaError};
pub use item::RegistryObject;
pub use module::{Module, Script, System};
pub use object::{Assignment, Object, SchemaIssue, SchemaProblem};
pub use reference::{Reference, Registered};
pub use registry::{Registry, SourceScope};
pub use types::{Field, TinyType, TypeCode};
pub use value::{EnumValue, Value};

pub use tiny_types::{AssetRef, Id, ObjectRef, ReferenceKind, Version};
