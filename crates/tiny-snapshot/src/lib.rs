//! Snapshot-write interface for the Tiny object model.
//!
//! [`write_record`] enumerates a registry object's declared properties as a
//! [`Record`] of kind-tagged [`PropertyValue`]s. The JSON and binary encoders
//! are thin back ends over records; neither knows about the registry.
//!
//! By default fields that inherit their value are omitted, so a reader must
//! treat an absent field as "use the declared default". [`read_object`] does
//! exactly that.

pub mod config;
pub mod encode;
pub mod error;
pub mod reader;
pub mod record;
pub mod writer;

pub use config::WriteOptions;
pub use encode::{decode_binary, decode_json, encode_binary, encode_json, load, save};
pub use error::{SnapshotError, SnapshotResult};
pub use reader::{apply_properties, read_object};
pub use record::{Property, PropertyValue, Record};
pub use writer::{write_all, write_object, write_record, write_records, write_registry, WRITE_ORDER};
