use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("registry error: {0}")]
    Registry(#[from] tiny_registry::RegistryError),

    #[error("caretaker error: {0}")]
    Caretaker(#[from] tiny_caretaker::CaretakerError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] tiny_snapshot::SnapshotError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;
