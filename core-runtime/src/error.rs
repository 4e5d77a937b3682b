use thiserror::Error;

/// Failures while loading settings or setting up the runtime.
#[derive(Error, Debug)]
pub enum Error {
    /// A setting is missing, malformed or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A feature was switched on without the section it depends on.
    #[error("{capability} is required: {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
