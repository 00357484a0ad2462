//! Error types for persistent state.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for state operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while loading or saving pipeline state.
///
/// `Corrupt` is never recovered from: without a trustworthy version index the
/// run cannot tell stale charts from current ones.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to read a state file.
    #[error("failed to read {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to write a state file.
    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The state file exists but does not parse.
    #[error("state file {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Failed to serialize state.
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}
