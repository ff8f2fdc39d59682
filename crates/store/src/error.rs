//! Error types for versioned storage

use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in versioned storage
#[derive(Debug, Error)]
pub enum Error {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Value at key {0} is not a set")]
    NotASet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ordo_common::TermError> for Error {
    fn from(e: ordo_common::TermError) -> Self {
        Error::Encoding(e.to_string())
    }
}
