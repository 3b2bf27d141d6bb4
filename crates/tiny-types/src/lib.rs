//! Foundation types for the Tiny object model.
//!
//! This crate provides the identity and versioning primitives shared by every
//! other Tiny crate. It has no knowledge of schemas or registries.
//!
//! # Key Types
//!
//! - [`Id`]: Stable 128-bit identifier, random or derived from a name
//! - [`Version`]: Monotonic mutation stamp drawn from a process-wide clock
//! - [`ReferenceKind`]: The kinds of top-level objects a reference can name
//! - [`ObjectRef`]: Untyped `(kind, id, name)` reference handle
//! - [`AssetRef`]: Opaque handle to an external asset

pub mod error;
pub mod handle;
pub mod id;
pub mod version;

pub use error::TypeError;
pub use handle::{AssetRef, ObjectRef, ReferenceKind};
pub use id::Id;
pub use version::Version;
