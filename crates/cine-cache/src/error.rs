//! Error types for cache operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur against the backing store.
///
/// Callers treat read failures as a miss and write failures as a no-op;
/// these variants exist so the store itself can report them precisely.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache directory unavailable: {0}")]
    DirectoryUnavailable(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
