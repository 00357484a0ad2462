//! Run and status reports.

use std::fmt;

use crate::pipeline::{AssetState, StageReport, TileSetOutcome};
use crate::planner::DownloadTask;
use crate::state::Version;

/// A chart whose download failed in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFailure {
    pub identifier: String,
    pub version: Version,
    pub reason: String,
}

/// Everything a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Set when the catalog could not be listed; nothing was downloaded.
    pub catalog_error: Option<String>,
    /// Chart versions downloaded and recorded.
    pub downloaded: Vec<DownloadTask>,
    /// Downloads that failed; planned again next run.
    pub failed_downloads: Vec<DownloadFailure>,
    /// Charts that needed no download.
    pub up_to_date: Vec<String>,
    /// One report per stage, in pipeline order.
    pub stages: Vec<StageReport>,
    /// `None` when no tiler is configured.
    pub tile_set: Option<TileSetOutcome>,
}

impl RunReport {
    /// Whether anything failed.
    pub fn has_failures(&self) -> bool {
        self.catalog_error.is_some()
            || !self.failed_downloads.is_empty()
            || self.stages.iter().any(StageReport::has_failures)
            || matches!(self.tile_set, Some(TileSetOutcome::Failed { .. }))
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.catalog_error {
            writeln!(f, "Catalog unavailable: {}", error)?;
        }
        writeln!(
            f,
            "Downloads: {} downloaded, {} failed, {} up to date",
            self.downloaded.len(),
            self.failed_downloads.len(),
            self.up_to_date.len()
        )?;
        for failure in &self.failed_downloads {
            writeln!(
                f,
                "  {} (version {}): {}",
                failure.identifier, failure.version, failure.reason
            )?;
        }
        for stage in &self.stages {
            writeln!(f, "{}", stage)?;
            for failure in &stage.failed {
                writeln!(f, "  {}: {}", failure.asset, failure.reason)?;
            }
        }
        match &self.tile_set {
            Some(outcome) => write!(f, "Tiles: {}", outcome),
            None => write!(f, "Tiles: not configured"),
        }
    }
}

/// Derived state of one known chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetStatus {
    pub identifier: String,
    /// Recorded version, if the chart was ever ingested.
    pub version: Option<Version>,
    pub state: AssetState,
}
