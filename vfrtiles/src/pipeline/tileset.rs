//! Final tile set built from every warped chart.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use super::error::{PipelineError, PipelineResult};
use super::layout::WorkspaceLayout;
use super::stage::{FanOutRules, StageKind};
use super::transform::TransformError;
use crate::state::{CompletionLedger, TileSetFingerprint, VersionStore};

/// Merges the warped charts into the published tile pyramid.
pub trait TileSetBuilder {
    /// Build the tiles from `inputs` (warped artifacts) into the layout's
    /// tiles directory, replacing any previous tiles.
    fn build(&self, inputs: &[PathBuf], layout: &WorkspaceLayout) -> Result<(), TransformError>;
}

impl<T: TileSetBuilder + ?Sized> TileSetBuilder for Box<T> {
    fn build(&self, inputs: &[PathBuf], layout: &WorkspaceLayout) -> Result<(), TransformError> {
        (**self).build(inputs, layout)
    }
}

/// What happened to the tile set during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileSetOutcome {
    /// Tiles rebuilt from this many charts.
    Built { charts: usize },
    /// Inputs unchanged since the last build.
    UpToDate { charts: usize },
    /// No chart has reached the warped stage yet.
    NothingToTile,
    /// The builder failed; the previous fingerprint is kept so the next run retries.
    Failed { reason: String },
}

impl fmt::Display for TileSetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileSetOutcome::Built { charts } => write!(f, "built from {} charts", charts),
            TileSetOutcome::UpToDate { charts } => {
                write!(f, "up to date ({} charts)", charts)
            }
            TileSetOutcome::NothingToTile => write!(f, "nothing to tile"),
            TileSetOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Decides whether the tile set needs rebuilding and runs the builder.
pub struct TileSet {
    builder: Box<dyn TileSetBuilder>,
}

impl fmt::Debug for TileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileSet").finish_non_exhaustive()
    }
}

impl TileSet {
    /// Create a tile set step around a builder.
    pub fn new(builder: impl TileSetBuilder + 'static) -> Self {
        Self {
            builder: Box::new(builder),
        }
    }

    /// Rebuild the tiles if the set of warped chart versions changed.
    ///
    /// Charts only count once their warped stage is recorded in the ledger
    /// for their current version and all their warped artifacts exist.
    pub fn refresh(
        &self,
        layout: &WorkspaceLayout,
        fan_out: &FanOutRules,
        versions: &dyn VersionStore,
        ledger: &mut CompletionLedger,
    ) -> PipelineResult<TileSetOutcome> {
        let (fingerprint, inputs) = warped_set(layout, fan_out, versions, ledger)?;

        if fingerprint.is_empty() {
            info!("No warped charts available, skipping tile generation");
            return Ok(TileSetOutcome::NothingToTile);
        }

        let charts = fingerprint.len();
        if ledger.tile_set() == Some(&fingerprint) && layout.tiles_present() {
            info!(charts, "Tile set up to date");
            return Ok(TileSetOutcome::UpToDate { charts });
        }

        info!(charts, "Creating map tiles");
        match self.builder.build(&inputs, layout) {
            Ok(()) => {
                ledger.set_tile_set(fingerprint)?;
                info!(charts, "Map tiles created");
                Ok(TileSetOutcome::Built { charts })
            }
            Err(e) => {
                warn!(error = %e, "Tile generation failed");
                Ok(TileSetOutcome::Failed {
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Fingerprint and input files of every chart complete at the warped stage.
fn warped_set(
    layout: &WorkspaceLayout,
    fan_out: &FanOutRules,
    versions: &dyn VersionStore,
    ledger: &CompletionLedger,
) -> PipelineResult<(TileSetFingerprint, Vec<PathBuf>)> {
    let stage = StageKind::Warped;
    let names = layout
        .list_artifacts(stage)
        .map_err(|e| PipelineError::ReadDir {
            path: layout.stage_dir(stage),
            source: e,
        })?;

    let assets: BTreeSet<&str> = names.iter().map(|n| fan_out.asset_of(n)).collect();

    let mut fingerprint = TileSetFingerprint::new();
    let mut inputs = Vec::new();
    for asset in assets {
        let Some(version) = versions.get(asset) else {
            continue;
        };
        if !ledger.is_complete(asset, stage, version) {
            continue;
        }
        let paths: Vec<PathBuf> = fan_out
            .artifact_names(asset, stage)
            .iter()
            .map(|name| layout.artifact_path(stage, name))
            .collect();
        if paths.iter().all(|p| p.exists()) {
            fingerprint.insert(asset, version);
            inputs.extend(paths);
        }
    }

    Ok((fingerprint, inputs))
}
