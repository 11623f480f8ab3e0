//! Error types for the storage and transport seams.
//!
//! None of these escape a `Session`: callers above the seam log them and
//! carry on with in-memory state.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("localStorage is not available")]
    Unavailable,
    #[error("error accessing localStorage: {0}")]
    Backend(String),
    #[error("failed to encode {key}: {reason}")]
    Encode { key: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("broadcast channel is not available")]
    Unavailable,
    #[error("failed to encode snapshot: {0}")]
    Encode(String),
    #[error("failed to post snapshot: {0}")]
    Post(String),
}
