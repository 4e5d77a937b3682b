use thiserror::Error;

/// Everything the façade can fail with.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A host collaborator could not be built.
    #[error("Failed to set up {0}")]
    InitializationFailed(String),

    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),

    #[error("Sync pass aborted: {0}")]
    Sync(#[from] core_sync::SyncError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
