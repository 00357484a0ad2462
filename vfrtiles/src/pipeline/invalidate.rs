//! Removal of every artifact derived from a chart.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::{debug, info};

use super::error::{PipelineError, PipelineResult};
use super::layout::WorkspaceLayout;
use super::stage::{FanOutRules, StageKind};
use crate::state::CompletionLedger;

/// Deletes a chart's artifacts in the raw stage and every stage after it.
///
/// Must run before a new version of the chart is written, so no stage ever
/// sees new raw input next to outputs derived from the old version.
#[derive(Debug, Clone)]
pub struct InvalidationCascade {
    layout: WorkspaceLayout,
    fan_out: FanOutRules,
}

impl InvalidationCascade {
    /// Create a cascade over the given layout.
    pub fn new(layout: WorkspaceLayout, fan_out: FanOutRules) -> Self {
        Self { layout, fan_out }
    }

    /// Remove every artifact of `identifier` and forget its completions.
    ///
    /// Besides the stage artifacts this removes partial outputs, a chart
    /// archive left by an interrupted download, and parts produced under
    /// earlier fan-out rules. Returns the files that were removed. Absent
    /// files are not an error, so calling this twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Invalidation` if any existing artifact cannot
    /// be deleted.
    pub fn invalidate(
        &self,
        identifier: &str,
        ledger: &mut CompletionLedger,
    ) -> PipelineResult<Vec<PathBuf>> {
        // Ledger first: a crash after this point leaves files without
        // records, which the pipeline recomputes anyway.
        ledger.clear(identifier)?;

        let mut targets = vec![self.layout.download_path(identifier)];
        for stage in StageKind::ALL {
            for name in self.fan_out.artifact_names(identifier, stage) {
                targets.push(self.layout.artifact_path(stage, &name));
                targets.push(self.layout.partial_path(stage, &name));
            }
        }
        targets.extend(self.former_parts(identifier)?);

        let mut removed = Vec::new();
        for path in targets {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(chart = %identifier, path = %path.display(), "Removed artifact");
                    removed.push(path);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(PipelineError::Invalidation {
                        identifier: identifier.to_string(),
                        path,
                        source: e,
                    })
                }
            }
        }

        if !removed.is_empty() {
            info!(chart = %identifier, files = removed.len(), "Invalidated artifacts");
        }
        Ok(removed)
    }

    /// Artifacts of parts the chart was split into under earlier fan-out rules.
    ///
    /// Any `<identifier>_<suffix>` artifact from the split stage onwards
    /// counts, unless it is a current part of some chart or a chart of its
    /// own (present in the raw or color-expanded stage).
    fn former_parts(&self, identifier: &str) -> PipelineResult<Vec<PathBuf>> {
        let charts: BTreeSet<String> = self
            .list(StageKind::Raw)?
            .into_iter()
            .chain(self.list(StageKind::ColorExpanded)?)
            .collect();
        let prefix = format!("{}_", identifier);

        let mut paths = Vec::new();
        for stage in StageKind::ALL {
            if stage < self.fan_out.split_at() {
                continue;
            }
            let current = self.fan_out.artifact_names(identifier, stage);
            for name in self.list(stage)? {
                let stale = name.starts_with(&prefix)
                    && !current.contains(&name)
                    && self.fan_out.asset_of(&name) == name.as_str()
                    && !charts.contains(&name);
                if stale {
                    paths.push(self.layout.artifact_path(stage, &name));
                }
            }
        }
        Ok(paths)
    }

    fn list(&self, stage: StageKind) -> PipelineResult<Vec<String>> {
        self.layout
            .list_artifacts(stage)
            .map_err(|e| PipelineError::ReadDir {
                path: self.layout.stage_dir(stage),
                source: e,
            })
    }
}
