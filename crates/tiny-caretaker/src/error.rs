use tiny_registry::RegistryError;
use tiny_types::{Id, ReferenceKind};

/// Errors from restoring mementos.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaretakerError {
    /// The memento was captured from a different object.
    #[error("memento of {actual} cannot restore {expected}")]
    OriginatorMismatch { expected: Id, actual: Id },

    /// The memento holds a different kind of state than the target.
    /// `None` stands for a bare object.
    #[error("cannot restore {id}: memento holds {actual:?}, target is {expected:?}")]
    KindMismatch {
        id: Id,
        expected: Option<ReferenceKind>,
        actual: Option<ReferenceKind>,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Result alias for caretaker operations.
pub type CaretakerResult<T> = Result<T, CaretakerError>;
