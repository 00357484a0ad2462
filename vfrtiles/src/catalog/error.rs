//! Error types for catalog access.

use thiserror::Error;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while listing the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The HTTP client could not be built.
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    /// The listing page could not be fetched.
    #[error("failed to fetch catalog {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The listing page answered with a non-success status.
    #[error("catalog {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },
}
