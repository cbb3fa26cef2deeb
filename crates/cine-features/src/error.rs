//! Error types for feature extraction.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for feature extraction.
pub type FeatureResult<T> = Result<T, FeatureError>;

/// Errors that can occur during feature extraction.
///
/// Only the inability to open the video container is fatal to a request;
/// audio failures degrade the profile instead (see `audio::AudioError`).
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Cannot open video container: {0}")]
    DecodeFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FeatureError {
    /// Create a decode failure error.
    pub fn decode_failure(message: impl Into<String>) -> Self {
        Self::DecodeFailure(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
