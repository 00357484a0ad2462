//! Remote catalog of published charts.
//!
//! A catalog answers one question: which charts exist upstream, and at
//! which version. Callers make no assumption about ordering or uniqueness
//! of the returned entries; the planner deduplicates them.

mod error;
mod faa;

pub use error::{CatalogError, CatalogResult};
pub use faa::{parse_listing, FaaSectionalCatalog, DEFAULT_CATALOG_URL};

use crate::state::Version;

/// One chart advertised by a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Chart identifier, e.g. `Seattle`.
    pub identifier: String,
    /// Archive download URL.
    pub url: String,
    /// Published version.
    pub version: Version,
}

impl CatalogEntry {
    pub fn new(identifier: impl Into<String>, url: impl Into<String>, version: Version) -> Self {
        Self {
            identifier: identifier.into(),
            url: url.into(),
            version,
        }
    }
}

/// Source of available chart versions.
pub trait RemoteCatalog {
    /// List every chart currently published.
    fn list_available(&self) -> CatalogResult<Vec<CatalogEntry>>;
}

impl<T: RemoteCatalog + ?Sized> RemoteCatalog for Box<T> {
    fn list_available(&self) -> CatalogResult<Vec<CatalogEntry>> {
        (**self).list_available()
    }
}

/// A fixed list of entries, for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }
}

impl RemoteCatalog for StaticCatalog {
    fn list_available(&self) -> CatalogResult<Vec<CatalogEntry>> {
        Ok(self.entries.clone())
    }
}
