//! Errors that abort a run.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::PipelineError;
use crate::state::StoreError;

/// Fatal run errors.
///
/// Download, transform, and tiling failures are not errors at this level:
/// they are recorded in the [`RunReport`](super::RunReport) and the run
/// continues.
#[derive(Debug, Error)]
pub enum RunError {
    /// The version store or ledger is unreadable or cannot be written.
    #[error("state store error: {0}")]
    Store(#[from] StoreError),

    /// Invalidation or stage directory failure.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// The workspace directories could not be created.
    #[error("failed to prepare workspace {}: {source}", .path.display())]
    Layout {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A required component was not supplied to the builder.
    #[error("orchestrator has no {0} configured")]
    Incomplete(&'static str),
}
