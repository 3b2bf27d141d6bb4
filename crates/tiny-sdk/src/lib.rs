//! High-level API for the Tiny object model.
//!
//! [`Project`] bundles a [`Registry`], a [`Caretaker`] and an [`UndoStack`]
//! behind a per-frame [`Project::tick`], configured by [`TinyConfig`].
//! The building blocks are re-exported for callers that need them directly.

pub mod config;
pub mod error;
pub mod project;

pub use config::TinyConfig;
pub use error::{SdkError, SdkResult};
pub use project::Project;

pub use tiny_caretaker::{
    CaptureDegradation, Caretaker, CaretakerConfig, CaretakerError, Change, ChangeKind, Memento,
    Originator, SubscriptionId, UndoStack,
};
pub use tiny_registry::{
    Assignment, BuiltinType, ConsistencyViolation, Entity, EntityGroup, EnumValue, Field, Module,
    Object, Reference, Registered, Registry, RegistryConfig, RegistryError, RegistryObject,
    SchemaError, SchemaIssue, SchemaProblem, Script, SourceScope, System, TinyType, TypeCode, Value,
};
pub use tiny_snapshot::{PropertyValue, Record, WriteOptions};
pub use tiny_types::{AssetRef, Id, ObjectRef, ReferenceKind, Version};
