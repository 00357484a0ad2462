//! Error types for chart downloads.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while downloading and extracting a chart.
///
/// None of these is fatal to a run: the chart is reported as failed and
/// planned again next time.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be built.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The request failed or the body could not be read.
    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("download of {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// A local file could not be written or read.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The archive could not be read.
    #[error("invalid archive {}: {reason}", .path.display())]
    Archive { path: PathBuf, reason: String },

    /// The archive holds no GeoTIFF.
    #[error("archive {} contains no .tif file", .path.display())]
    NoRaster { path: PathBuf },
}
