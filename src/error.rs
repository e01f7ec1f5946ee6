use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the bgr-fixer library
#[derive(Error, Debug)]
pub enum FixerError {
    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to open video file {path}: {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("No video stream found in {path}")]
    NoVideoStream { path: String },

    #[error("Encoder not available: {codec}")]
    CodecNotFound { codec: String },

    #[error("Video decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Frame processing failed: {reason}")]
    FrameProcessingFailed { reason: String },

    #[error("Could not replace {path}: {reason}")]
    ReplaceFailed { path: String, reason: String },

    #[error("Unsupported operation: {reason}")]
    Unsupported { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using FixerError
pub type Result<T> = std::result::Result<T, FixerError>;

impl FixerError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error leaves state an operator can recover by hand
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Video(VideoError::ReplaceFailed { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Video(VideoError::OpenFailed { path, .. }) => {
                format!("Could not open video file '{}'. Please check the file exists and is a readable video.", path)
            }
            Self::Video(VideoError::CodecNotFound { codec }) => {
                format!("Encoder '{}' is not available in this FFmpeg build.", codec)
            }
            Self::Video(VideoError::ReplaceFailed { path, reason }) => {
                format!("Could not replace '{}' ({}). The original is untouched; remove any leftover temporary file by hand.", path, reason)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

/// A single file's failure, kept alongside the path it happened on
#[derive(Error, Debug)]
#[error("{}: {}", .path.display(), .error)]
pub struct FixFailure {
    pub path: PathBuf,
    #[source]
    pub error: FixerError,
}

impl FixFailure {
    pub fn new<P: Into<PathBuf>>(path: P, error: FixerError) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }
}
