//! Error types for the Notion provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Notion provider errors
#[derive(Error, Debug)]
pub enum NotionError {
    /// The integration token was rejected
    #[error("Notion rejected the integration token: {0}")]
    Unauthorized(String),

    /// API request returned an error
    #[error("Notion API error (status {status_code}, {code}): {message}")]
    ApiError {
        status_code: u16,
        code: String,
        message: String,
    },

    /// Still rate limited after every retry
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    /// Page, database or block does not exist or is not shared with the integration
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Notion operations
pub type Result<T> = std::result::Result<T, NotionError>;

impl From<NotionError> for BridgeError {
    fn from(error: NotionError) -> Self {
        match error {
            NotionError::NotFound(message) => BridgeError::NotFound(message),
            NotionError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
