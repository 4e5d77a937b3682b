//! Error types for the PicGo provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PicGoError {
    /// Upload server answered with a non-2xx status
    #[error("PicGo server error (status {status_code}): {message}")]
    ServerError { status_code: u16, message: String },

    #[error("Failed to parse PicGo response: {0}")]
    ParseError(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, PicGoError>;

impl From<PicGoError> for BridgeError {
    fn from(error: PicGoError) -> Self {
        match error {
            PicGoError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
