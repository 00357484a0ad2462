//! Per-chart, per-stage completion records.
//!
//! A stage output file on disk only proves that *something* wrote it. The
//! ledger records that a stage finished for a specific chart version, so a
//! stage is considered done only when both the record and the files exist.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::StoreResult;
use super::json_file;
use super::version_store::Version;
use crate::pipeline::StageKind;

/// One `(identifier, stage, version)` completion triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub identifier: String,
    pub stage: StageKind,
    pub version: Version,
}

/// The set of chart versions that went into the last tile build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileSetFingerprint(BTreeMap<String, Version>);

impl TileSetFingerprint {
    /// Create an empty fingerprint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chart at the given version.
    pub fn insert(&mut self, identifier: impl Into<String>, version: Version) {
        self.0.insert(identifier.into(), version);
    }

    /// Whether the fingerprint holds the chart at exactly this version.
    pub fn contains(&self, identifier: &str, version: Version) -> bool {
        self.0.get(identifier) == Some(&version)
    }

    /// Drop a chart from the fingerprint.
    pub fn remove(&mut self, identifier: &str) {
        self.0.remove(identifier);
    }

    /// Number of charts.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no charts are included.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Version)> for TileSetFingerprint {
    fn from_iter<I: IntoIterator<Item = (String, Version)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerData {
    #[serde(default)]
    completed: BTreeSet<CompletionRecord>,
    #[serde(default)]
    tile_set: Option<TileSetFingerprint>,
}

/// Persistent completion ledger (`completion_ledger.json`).
///
/// Holds at most one record per `(identifier, stage)`: recording a new
/// version replaces the old one.
#[derive(Debug)]
pub struct CompletionLedger {
    path: Option<PathBuf>,
    data: LedgerData,
}

impl CompletionLedger {
    /// Open the ledger at `path`, starting empty if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if the file cannot be parsed.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = json_file::load(&path)?;
        Ok(Self {
            path: Some(path),
            data,
        })
    }

    /// A ledger that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: LedgerData::default(),
        }
    }

    /// Whether `stage` finished for the chart at exactly `version`.
    pub fn is_complete(&self, identifier: &str, stage: StageKind, version: Version) -> bool {
        self.data.completed.contains(&CompletionRecord {
            identifier: identifier.to_string(),
            stage,
            version,
        })
    }

    /// Record that `stage` finished for the chart at `version`.
    pub fn record(
        &mut self,
        identifier: &str,
        stage: StageKind,
        version: Version,
    ) -> StoreResult<()> {
        self.data
            .completed
            .retain(|r| !(r.identifier == identifier && r.stage == stage));
        self.data.completed.insert(CompletionRecord {
            identifier: identifier.to_string(),
            stage,
            version,
        });
        self.persist()
    }

    /// Forget every completion of a chart.
    ///
    /// The chart is also dropped from the tile set fingerprint so the next
    /// tile build picks up its new version.
    pub fn clear(&mut self, identifier: &str) -> StoreResult<()> {
        let before = self.data.completed.len();
        self.data.completed.retain(|r| r.identifier != identifier);

        let mut changed = before != self.data.completed.len();
        if let Some(fingerprint) = self.data.tile_set.as_mut() {
            if fingerprint.0.contains_key(identifier) {
                fingerprint.remove(identifier);
                changed = true;
            }
        }

        if changed {
            self.persist()?;
        }
        Ok(())
    }

    /// Completion records of one chart.
    pub fn records_for<'a>(
        &'a self,
        identifier: &'a str,
    ) -> impl Iterator<Item = &'a CompletionRecord> + 'a {
        self.data
            .completed
            .iter()
            .filter(move |r| r.identifier == identifier)
    }

    /// Fingerprint of the last successful tile build.
    pub fn tile_set(&self) -> Option<&TileSetFingerprint> {
        self.data.tile_set.as_ref()
    }

    /// Record the fingerprint of a successful tile build.
    pub fn set_tile_set(&mut self, fingerprint: TileSetFingerprint) -> StoreResult<()> {
        self.data.tile_set = Some(fingerprint);
        self.persist()
    }

    fn persist(&self) -> StoreResult<()> {
        match &self.path {
            Some(path) => json_file::save(path, &self.data),
            None => Ok(()),
        }
    }
}
