//! Error handling module for VideoHelper

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for VideoHelper operations
#[derive(Error, Debug)]
pub enum VideoHelperError {
    /// Error raised by an operation's own logic
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Invalid time format
    #[error("Invalid time format: {time}. Expected HH:MM:SS.ms, MM:SS.ms, or seconds")]
    InvalidTimeFormat { time: String },

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// FFmpeg error
    #[error("FFmpeg error: {0}")]
    FFmpegError(#[from] ffmpeg_next::Error),
}

impl From<VideoHelperError> for DomainError {
    fn from(err: VideoHelperError) -> Self {
        match err {
            VideoHelperError::Domain(domain) => domain,
            VideoHelperError::InvalidTimeFormat { time } => {
                DomainError::BadArgs(format!("Invalid time format: {}", time))
            }
            VideoHelperError::ConfigParse(parse) => DomainError::Config(parse.to_string()),
            VideoHelperError::IoError(io) => DomainError::Io(io.to_string()),
            other => DomainError::EncodeFailure(other.to_string()),
        }
    }
}

/// Result type alias for VideoHelper operations
pub type VideoHelperResult<T> = std::result::Result<T, VideoHelperError>;
