use thiserror::Error;

/// The single failure type crossing every collaborator seam.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The host cannot provide the capability at all.
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Missing file, record or block.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
