//! Error types for the stage pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::state::StoreError;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that stop the pipeline.
///
/// A single failed transform is not one of them: it is logged, counted in
/// the stage report, and retried on the next run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage directory could not be listed.
    #[error("failed to list {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stage directory could not be created.
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stale artifact could not be deleted.
    ///
    /// Continuing would let a later stage treat the stale file as current.
    #[error("failed to invalidate {identifier}: cannot remove {}: {source}", .path.display())]
    Invalidation {
        identifier: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The completion ledger could not be updated.
    #[error(transparent)]
    Store(#[from] StoreError),
}
