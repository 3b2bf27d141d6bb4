//! Change tracking and undo/redo for the Tiny registry.
//!
//! - [`Memento`]: immutable deep snapshot of one object at one version
//! - [`Originator`]: save/restore for objects and registry items
//! - [`Caretaker`]: per-frame version polling and change notification
//! - [`UndoStack`]: grouped undo/redo over caretaker changes

pub mod caretaker;
pub mod config;
pub mod error;
pub mod memento;
pub mod undo;

pub use caretaker::{Caretaker, Change, ChangeKind, SubscriptionId};
pub use config::CaretakerConfig;
pub use error::{CaretakerError, CaretakerResult};
pub use memento::{restore_into, CaptureDegradation, Memento, Originator};
pub use undo::UndoStack;
