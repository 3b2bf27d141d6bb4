use tiny_registry::{RegistryError, SchemaError};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SchemaError> for SnapshotError {
    fn from(e: SchemaError) -> Self {
        SnapshotError::Registry(e.into())
    }
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;
