//! Recorded chart versions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::StoreResult;
use super::json_file;

/// Chart version number as published in the catalog (e.g. `20240321`).
pub type Version = u64;

/// Persistent mapping from chart identifier to the last ingested version.
///
/// A missing entry means the chart was never ingested. Versions only move
/// forward: writing a version lower than the recorded one is a no-op and
/// `set` reports it by returning `false`.
pub trait VersionStore {
    /// Get the recorded version for a chart.
    fn get(&self, identifier: &str) -> Option<Version>;

    /// Record a version for a chart.
    ///
    /// Returns `true` if the version was recorded, `false` if it was lower
    /// than the version already on record.
    fn set(&mut self, identifier: &str, version: Version) -> StoreResult<bool>;

    /// All identifiers with a recorded version, in sorted order.
    fn identifiers(&self) -> Vec<String>;
}

/// Whether `new` may replace `current`.
fn accepts(identifier: &str, current: Option<Version>, new: Version) -> bool {
    match current {
        Some(current) if new < current => {
            warn!(
                chart = %identifier,
                recorded = current,
                attempted = new,
                "Ignoring version regression"
            );
            false
        }
        _ => true,
    }
}

/// A recorded version and when it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Ingested version.
    pub version: Version,
    /// When the version was recorded.
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct VersionIndex {
    #[serde(default)]
    versions: BTreeMap<String, VersionRecord>,
}

/// File-backed version store (`version_index.json`).
///
/// Every `set` rewrites the whole index atomically, so a recorded version is
/// durable as soon as `set` returns.
#[derive(Debug)]
pub struct JsonVersionStore {
    path: PathBuf,
    index: VersionIndex,
}

impl JsonVersionStore {
    /// Open the store at `path`, creating an empty one if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if the file exists but cannot be parsed.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let index: VersionIndex = json_file::load(&path)?;
        debug!(path = %path.display(), charts = index.versions.len(), "Opened version index");
        Ok(Self { path, index })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full record for a chart, including when it was written.
    pub fn record(&self, identifier: &str) -> Option<&VersionRecord> {
        self.index.versions.get(identifier)
    }
}

impl VersionStore for JsonVersionStore {
    fn get(&self, identifier: &str) -> Option<Version> {
        self.index.versions.get(identifier).map(|r| r.version)
    }

    fn set(&mut self, identifier: &str, version: Version) -> StoreResult<bool> {
        if !accepts(identifier, self.get(identifier), version) {
            return Ok(false);
        }

        self.index.versions.insert(
            identifier.to_string(),
            VersionRecord {
                version,
                recorded_at: Utc::now(),
            },
        );
        json_file::save(&self.path, &self.index)?;
        Ok(true)
    }

    fn identifiers(&self) -> Vec<String> {
        self.index.versions.keys().cloned().collect()
    }
}

/// In-memory version store for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryVersionStore {
    versions: BTreeMap<String, Version>,
}

impl MemoryVersionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionStore for MemoryVersionStore {
    fn get(&self, identifier: &str) -> Option<Version> {
        self.versions.get(identifier).copied()
    }

    fn set(&mut self, identifier: &str, version: Version) -> StoreResult<bool> {
        if !accepts(identifier, self.get(identifier), version) {
            return Ok(false);
        }
        self.versions.insert(identifier.to_string(), version);
        Ok(true)
    }

    fn identifiers(&self) -> Vec<String> {
        self.versions.keys().cloned().collect()
    }
}
