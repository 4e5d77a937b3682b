use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkdownError {
    #[error("Failed to fetch children of block {block_id}: {source}")]
    Fetch {
        block_id: String,
        #[source]
        source: BridgeError,
    },
}

impl From<MarkdownError> for BridgeError {
    fn from(error: MarkdownError) -> Self {
        match error {
            MarkdownError::Fetch { block_id, source } => match source {
                BridgeError::NotFound(_) => BridgeError::NotFound(block_id),
                other => BridgeError::OperationFailed(format!(
                    "Failed to fetch children of block {}: {}",
                    block_id, other
                )),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, MarkdownError>;
