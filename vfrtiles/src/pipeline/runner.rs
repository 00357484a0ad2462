//! Sequential, ledger-gated execution of the per-chart stages.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::error::{PipelineError, PipelineResult};
use super::layout::WorkspaceLayout;
use super::stage::{AssetState, FanOutRules, StageKind};
use super::transform::{Transform, TransformError, TransformJob};
use crate::state::{CompletionLedger, Version, VersionStore};

/// A chart that failed in a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub asset: String,
    pub reason: String,
}

/// Outcome of one stage over every input chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub kind: StageKind,
    /// Charts transformed in this run.
    pub processed: usize,
    /// Charts already complete for their current version.
    pub skipped: usize,
    /// Charts whose transform failed; retried on the next run.
    pub failed: Vec<StageFailure>,
    /// Charts present upstream but not complete there.
    pub blocked: usize,
}

impl StageReport {
    fn new(kind: StageKind) -> Self {
        Self {
            kind,
            processed: 0,
            skipped: 0,
            failed: Vec::new(),
            blocked: 0,
        }
    }

    /// Whether any chart failed in this stage.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} processed, {} skipped, {} failed, {} blocked",
            self.kind,
            self.processed,
            self.skipped,
            self.failed.len(),
            self.blocked
        )
    }
}

/// The chain of per-chart stages after the raw download.
///
/// Each stage reads the previous stage's directory and writes its own.
/// A chart is transformed only when it is complete upstream and not yet
/// complete here, where "complete" means the ledger holds
/// `(chart, stage, current version)` and every expected artifact exists.
/// Outputs are written to a hidden partial file and renamed into place,
/// so a visible artifact is always a finished one.
pub struct StagePipeline {
    layout: WorkspaceLayout,
    fan_out: FanOutRules,
    transforms: BTreeMap<StageKind, Box<dyn Transform>>,
}

impl fmt::Debug for StagePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagePipeline")
            .field("layout", &self.layout)
            .field("fan_out", &self.fan_out)
            .field("stages", &self.transforms.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StagePipeline {
    /// Create a pipeline with no transforms registered.
    pub fn new(layout: WorkspaceLayout, fan_out: FanOutRules) -> Self {
        Self {
            layout,
            fan_out,
            transforms: BTreeMap::new(),
        }
    }

    /// Register the transform of a stage, replacing any previous one.
    ///
    /// The raw stage is filled by the fetcher; a transform registered for it
    /// is never run.
    pub fn with_stage(mut self, kind: StageKind, transform: impl Transform + 'static) -> Self {
        self.transforms.insert(kind, Box::new(transform));
        self
    }

    /// Register a boxed transform.
    pub fn set_stage(&mut self, kind: StageKind, transform: Box<dyn Transform>) {
        self.transforms.insert(kind, transform);
    }

    /// Workspace layout.
    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Fan-out rules.
    pub fn fan_out(&self) -> &FanOutRules {
        &self.fan_out
    }

    /// Run every stage after the raw one, in order.
    ///
    /// # Errors
    ///
    /// Only directory and ledger I/O errors stop the pipeline; transform
    /// failures are collected in the reports.
    pub fn run_all(
        &self,
        versions: &dyn VersionStore,
        ledger: &mut CompletionLedger,
    ) -> PipelineResult<Vec<StageReport>> {
        let mut reports = Vec::new();
        for kind in StageKind::ALL {
            if kind.previous().is_none() {
                continue;
            }
            reports.push(self.run_stage(kind, versions, ledger)?);
        }
        Ok(reports)
    }

    /// Run a single stage over every chart present in its input directory.
    pub fn run_stage(
        &self,
        kind: StageKind,
        versions: &dyn VersionStore,
        ledger: &mut CompletionLedger,
    ) -> PipelineResult<StageReport> {
        let mut report = StageReport::new(kind);
        let Some(previous) = kind.previous() else {
            return Ok(report);
        };
        let Some(transform) = self.transforms.get(&kind) else {
            warn!(stage = %kind, "No transform registered, stage not run");
            return Ok(report);
        };

        let output_dir = self.layout.stage_dir(kind);
        fs::create_dir_all(&output_dir).map_err(|e| PipelineError::CreateDir {
            path: output_dir.clone(),
            source: e,
        })?;

        let names = self
            .layout
            .list_artifacts(previous)
            .map_err(|e| PipelineError::ReadDir {
                path: self.layout.stage_dir(previous),
                source: e,
            })?;
        let assets: BTreeSet<&str> = names.iter().map(|n| self.fan_out.asset_of(n)).collect();

        for asset in assets {
            let Some(version) = versions.get(asset) else {
                warn!(chart = %asset, stage = %kind, "Chart has no recorded version, not processing");
                report.blocked += 1;
                continue;
            };

            if !self.is_complete(asset, previous, version, ledger) {
                debug!(chart = %asset, stage = %kind, "Upstream stage incomplete");
                report.blocked += 1;
                continue;
            }

            if self.is_complete(asset, kind, version, ledger) {
                debug!(chart = %asset, stage = %kind, "Already complete, skipping");
                report.skipped += 1;
                continue;
            }

            match self.process(asset, kind, previous, &**transform) {
                Ok(()) => {
                    ledger.record(asset, kind, version)?;
                    report.processed += 1;
                }
                Err(e) => {
                    warn!(chart = %asset, stage = %kind, error = %e, "Transform failed");
                    report.failed.push(StageFailure {
                        asset: asset.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            stage = %kind,
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed.len(),
            blocked = report.blocked,
            "Stage finished"
        );
        Ok(report)
    }

    /// Whether a chart finished `stage` for `version`.
    ///
    /// The raw stage has no ledger entries: its artifact is published
    /// atomically by the fetcher, so presence is enough.
    pub fn is_complete(
        &self,
        asset: &str,
        stage: StageKind,
        version: Version,
        ledger: &CompletionLedger,
    ) -> bool {
        let recorded = stage == StageKind::Raw || ledger.is_complete(asset, stage, version);
        recorded && self.outputs_present(asset, stage)
    }

    /// Derived pipeline state of a chart.
    pub fn asset_state(
        &self,
        asset: &str,
        versions: &dyn VersionStore,
        ledger: &CompletionLedger,
    ) -> AssetState {
        if !self.outputs_present(asset, StageKind::Raw) {
            return AssetState::Missing;
        }
        let Some(version) = versions.get(asset) else {
            return AssetState::RawPresent;
        };

        let mut state = AssetState::RawPresent;
        for stage in StageKind::ALL.into_iter().skip(1) {
            if !self.is_complete(asset, stage, version, ledger) {
                return state;
            }
            state = AssetState::after(stage);
        }

        let tiled = ledger
            .tile_set()
            .map(|fingerprint| fingerprint.contains(asset, version))
            .unwrap_or(false);
        if tiled && self.layout.tiles_present() {
            AssetState::Tiled
        } else {
            state
        }
    }

    fn outputs_present(&self, asset: &str, stage: StageKind) -> bool {
        self.fan_out
            .artifact_names(asset, stage)
            .iter()
            .all(|name| self.layout.artifact_path(stage, name).is_file())
    }

    /// Run every job of one chart in one stage.
    fn process(
        &self,
        asset: &str,
        kind: StageKind,
        previous: StageKind,
        transform: &dyn Transform,
    ) -> Result<(), TransformError> {
        let inputs = self.fan_out.artifact_names(asset, previous);
        let outputs = self.fan_out.artifact_names(asset, kind);

        // 1:1 on names, except the split where the single input feeds every part.
        let jobs: Vec<(PathBuf, &String)> = outputs
            .iter()
            .enumerate()
            .map(|(i, output)| {
                let input = if inputs.len() == outputs.len() {
                    &inputs[i]
                } else {
                    &inputs[0]
                };
                (self.layout.artifact_path(previous, input), output)
            })
            .collect();

        for (input, artifact) in jobs {
            debug!(chart = %asset, artifact = %artifact, tool = transform.name(), "Transforming");
            self.run_job(transform, asset, artifact, &input, kind)?;
        }

        info!(chart = %asset, stage = %kind, "Stage output published");
        Ok(())
    }

    fn run_job(
        &self,
        transform: &dyn Transform,
        asset: &str,
        artifact: &str,
        input: &Path,
        kind: StageKind,
    ) -> Result<(), TransformError> {
        let partial = self.layout.partial_path(kind, artifact);
        let output = self.layout.artifact_path(kind, artifact);
        remove_if_present(&partial).map_err(|e| TransformError::Publish {
            path: partial.clone(),
            source: e,
        })?;

        let job = TransformJob {
            asset,
            artifact,
            input,
            output: &partial,
        };

        let result = transform.apply(&job).and_then(|()| {
            if !partial.is_file() {
                return Err(TransformError::MissingOutput(partial.clone()));
            }
            fs::rename(&partial, &output).map_err(|e| TransformError::Publish {
                path: output.clone(),
                source: e,
            })
        });

        if result.is_err() {
            if let Err(e) = remove_if_present(&partial) {
                warn!(path = %partial.display(), error = %e, "Failed to remove partial output");
            }
        }
        result
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::WESTERN_ALEUTIAN_ISLANDS;
    use crate::state::MemoryVersionStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Copies input to output and records every artifact it produced.
    #[derive(Clone, Default)]
    struct RecordingTransform {
        calls: Rc<RefCell<Vec<String>>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingTransform {
        fn failing_on(artifact: &'static str) -> Self {
            Self {
                fail_on: Some(artifact),
                ..Self::default()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl Transform for RecordingTransform {
        fn name(&self) -> &str {
            "recording"
        }

        fn apply(&self, job: &TransformJob<'_>) -> Result<(), TransformError> {
            self.calls.borrow_mut().push(job.artifact.to_string());
            fs::copy(job.input, job.output).map_err(|e| TransformError::Other(e.to_string()))?;
            if self.fail_on == Some(job.artifact) {
                return Err(TransformError::Other("boom".to_string()));
            }
            Ok(())
        }
    }

    struct Fixture {
        _temp: tempfile::TempDir,
        layout: WorkspaceLayout,
        versions: MemoryVersionStore,
        ledger: CompletionLedger,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = tempfile::TempDir::new().unwrap();
            let layout = WorkspaceLayout::new(temp.path().join("tmp"), temp.path().join("tiles"));
            layout.ensure_dirs().unwrap();
            Self {
                _temp: temp,
                layout,
                versions: MemoryVersionStore::new(),
                ledger: CompletionLedger::in_memory(),
            }
        }

        fn ingest(&mut self, identifier: &str, version: Version) {
            fs::write(self.layout.artifact_path(StageKind::Raw, identifier), b"raw").unwrap();
            self.versions.set(identifier, version).unwrap();
        }

        fn pipeline(&self, fan_out: FanOutRules, transform: &RecordingTransform) -> StagePipeline {
            StagePipeline::new(self.layout.clone(), fan_out)
                .with_stage(StageKind::ColorExpanded, transform.clone())
                .with_stage(StageKind::Cropped, transform.clone())
                .with_stage(StageKind::Warped, transform.clone())
        }
    }

    #[test]
    fn test_processes_every_stage() {
        let mut fx = Fixture::new();
        fx.ingest("Seattle", 5);
        let transform = RecordingTransform::default();
        let pipeline = fx.pipeline(FanOutRules::empty(), &transform);

        let reports = pipeline.run_all(&fx.versions, &mut fx.ledger).unwrap();

        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.processed == 1 && !r.has_failures()));
        assert!(fx.layout.artifact_path(StageKind::Warped, "Seattle").is_file());
        assert!(fx.ledger.is_complete("Seattle", StageKind::Warped, 5));
        assert_eq!(
            pipeline.asset_state("Seattle", &fx.versions, &fx.ledger),
            AssetState::Warped
        );
    }

    #[test]
    fn test_second_run_makes_no_calls() {
        let mut fx = Fixture::new();
        fx.ingest("Seattle", 5);
        fx.ingest("Denver", 3);
        let transform = RecordingTransform::default();
        let pipeline = fx.pipeline(FanOutRules::empty(), &transform);

        pipeline.run_all(&fx.versions, &mut fx.ledger).unwrap();
        let first = transform.call_count();
        let reports = pipeline.run_all(&fx.versions, &mut fx.ledger).unwrap();

        assert_eq!(first, 6);
        assert_eq!(transform.call_count(), first);
        assert!(reports.iter().all(|r| r.skipped == 2 && r.processed == 0));
    }

    #[test]
    fn test_output_without_ledger_entry_is_recomputed() {
        let mut fx = Fixture::new();
        fx.ingest("Seattle", 5);
        // Left behind by a run killed before the ledger was written.
        fs::write(
            fx.layout.artifact_path(StageKind::ColorExpanded, "Seattle"),
            b"stale",
        )
        .unwrap();
        let transform = RecordingTransform::default();
        let pipeline = fx.pipeline(FanOutRules::empty(), &transform);

        let report = pipeline
            .run_stage(StageKind::ColorExpanded, &fx.versions, &mut fx.ledger)
            .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(
            fs::read(fx.layout.artifact_path(StageKind::ColorExpanded, "Seattle")).unwrap(),
            b"raw"
        );
    }

    #[test]
    fn test_completion_for_older_version_is_not_reused() {
        let mut fx = Fixture::new();
        fx.ingest("Seattle", 5);
        let transform = RecordingTransform::default();
        let pipeline = fx.pipeline(FanOutRules::empty(), &transform);
        pipeline.run_all(&fx.versions, &mut fx.ledger).unwrap();

        fx.versions.set("Seattle", 6).unwrap();
        let reports = pipeline.run_all(&fx.versions, &mut fx.ledger).unwrap();

        assert!(reports.iter().all(|r| r.processed == 1));
        assert!(fx.ledger.is_complete("Seattle", StageKind::Warped, 6));
    }

    #[test]
    fn test_failure_leaves_no_partial_output() {
        let mut fx = Fixture::new();
        fx.ingest("Seattle", 5);
        fx.ingest("Denver", 3);
        let transform = RecordingTransform::failing_on("Seattle");
        let pipeline = fx.pipeline(FanOutRules::empty(), &transform);

        let report = pipeline
            .run_stage(StageKind::ColorExpanded, &fx.versions, &mut fx.ledger)
            .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].asset, "Seattle");
        let stage = StageKind::ColorExpanded;
        assert!(!fx.layout.artifact_path(stage, "Seattle").exists());
        assert!(!fx.layout.partial_path(stage, "Seattle").exists());
        assert!(!fx.ledger.is_complete("Seattle", stage, 5));
        assert!(fx.layout.artifact_path(stage, "Denver").is_file());
    }

    #[test]
    fn test_failed_asset_blocks_later_stages() {
        let mut fx = Fixture::new();
        fx.ingest("Seattle", 5);
        let transform = RecordingTransform::failing_on("Seattle");
        let pipeline = fx.pipeline(FanOutRules::empty(), &transform);

        let reports = pipeline.run_all(&fx.versions, &mut fx.ledger).unwrap();

        assert_eq!(reports[0].failed.len(), 1);
        assert_eq!(reports[1].blocked, 0);
        assert_eq!(reports[1].processed, 0);
        assert_eq!(transform.call_count(), 1);
    }

    #[test]
    fn test_unversioned_raw_is_blocked() {
        let fx = Fixture::new();
        fs::write(fx.layout.artifact_path(StageKind::Raw, "Seattle"), b"raw").unwrap();
        let transform = RecordingTransform::default();
        let pipeline = fx.pipeline(FanOutRules::empty(), &transform);
        let mut ledger = CompletionLedger::in_memory();

        let report = pipeline
            .run_stage(StageKind::ColorExpanded, &fx.versions, &mut ledger)
            .unwrap();

        assert_eq!(report.blocked, 1);
        assert_eq!(transform.call_count(), 0);
        assert_eq!(
            pipeline.asset_state("Seattle", &fx.versions, &ledger),
            AssetState::RawPresent
        );
    }

    #[test]
    fn test_split_produces_every_part() {
        let mut fx = Fixture::new();
        fx.ingest(WESTERN_ALEUTIAN_ISLANDS, 7);
        let transform = RecordingTransform::default();
        let pipeline = fx.pipeline(FanOutRules::default(), &transform);

        pipeline.run_all(&fx.versions, &mut fx.ledger).unwrap();

        assert_eq!(
            *transform.calls.borrow(),
            vec![
                "Western_Aleutian_Islands",
                "Western_Aleutian_Islands_East",
                "Western_Aleutian_Islands_West",
                "Western_Aleutian_Islands_East",
                "Western_Aleutian_Islands_West",
            ]
        );
        assert_eq!(
            fx.layout.list_artifacts(StageKind::Warped).unwrap(),
            vec![
                "Western_Aleutian_Islands_East",
                "Western_Aleutian_Islands_West"
            ]
        );
        assert!(fx
            .ledger
            .is_complete(WESTERN_ALEUTIAN_ISLANDS, StageKind::Warped, 7));
    }

    #[test]
    fn test_split_completion_requires_every_part() {
        let mut fx = Fixture::new();
        fx.ingest(WESTERN_ALEUTIAN_ISLANDS, 7);
        let transform = RecordingTransform::failing_on("Western_Aleutian_Islands_West");
        let pipeline = fx.pipeline(FanOutRules::default(), &transform);

        let reports = pipeline.run_all(&fx.versions, &mut fx.ledger).unwrap();

        let cropped = &reports[1];
        assert_eq!(cropped.kind, StageKind::Cropped);
        assert_eq!(cropped.failed.len(), 1);
        assert!(!fx
            .ledger
            .is_complete(WESTERN_ALEUTIAN_ISLANDS, StageKind::Cropped, 7));
        assert_eq!(reports[2].blocked, 1);
        assert_eq!(
            pipeline.asset_state(WESTERN_ALEUTIAN_ISLANDS, &fx.versions, &fx.ledger),
            AssetState::ColorExpanded
        );
    }

    #[test]
    fn test_missing_transform_runs_nothing() {
        let mut fx = Fixture::new();
        fx.ingest("Seattle", 5);
        let pipeline = StagePipeline::new(fx.layout.clone(), FanOutRules::empty());

        let reports = pipeline.run_all(&fx.versions, &mut fx.ledger).unwrap();

        assert!(reports.iter().all(|r| r.processed == 0));
        assert_eq!(
            pipeline.asset_state("Seattle", &fx.versions, &fx.ledger),
            AssetState::RawPresent
        );
    }

    #[test]
    fn test_missing_chart_state() {
        let fx = Fixture::new();
        let pipeline = StagePipeline::new(fx.layout.clone(), FanOutRules::empty());
        assert_eq!(
            pipeline.asset_state("Seattle", &fx.versions, &fx.ledger),
            AssetState::Missing
        );
    }

    #[test]
    fn test_report_display() {
        let mut report = StageReport::new(StageKind::Cropped);
        report.processed = 2;
        report.blocked = 1;
        assert_eq!(
            report.to_string(),
            "cropped: 2 processed, 0 skipped, 0 failed, 1 blocked"
        );
    }
}
