use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid sync configuration: {0}")]
    Config(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("File system error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Artifact header could not be serialized: {0}")]
    Header(String),

    #[error("Conversion of record {record_id} failed: {message}")]
    Conversion { record_id: String, message: String },
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        SyncError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn conversion(record_id: impl Into<String>, err: impl std::fmt::Display) -> Self {
        SyncError::Conversion {
            record_id: record_id.into(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
