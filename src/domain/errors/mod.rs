// Domain errors - Error taxonomy shared by every operation

use thiserror::Error;

/// Domain-specific error types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// Source unreadable or missing a required metadata field
    #[error("{0}")]
    Probe(String),

    /// External encoder exited abnormally or could not be launched
    #[error("{0}")]
    EncodeFailure(String),

    /// Encoder reported a user abort
    #[error("Transcode canceled!")]
    EncodeCanceled,

    /// No matching tracks, or the remuxed output is empty
    #[error("Remux failed: {0}")]
    RemuxFailure(String),

    /// Directory or file creation failure
    #[error("{0}")]
    Io(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DomainError {
    /// True when the error represents the encoder's own abort condition
    pub fn is_canceled(&self) -> bool {
        matches!(self, DomainError::EncodeCanceled)
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}
