//! Integration tests for incremental update runs.
//!
//! These tests drive the orchestrator through its public API with fake
//! network and raster components, covering:
//! - First ingest and no-op reruns
//! - A new chart edition invalidating and rebuilding every stage
//! - Failed downloads leaving the rest of the run intact
//! - Charts split into parts
//! - Tile set rebuilds only when the warped inputs change
//! - State surviving across orchestrator instances
//!
//! Run with: `cargo test --test incremental_run`

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tempfile::TempDir;

use vfrtiles::catalog::{CatalogEntry, CatalogResult, RemoteCatalog};
use vfrtiles::fetch::{AssetFetcher, FetchError, FetchResult};
use vfrtiles::orchestrator::{Orchestrator, RunReport};
use vfrtiles::pipeline::{
    AssetState, FanOutRules, StageKind, TileSetBuilder, TileSetOutcome, Transform,
    TransformError, TransformJob, WorkspaceLayout,
};
use vfrtiles::planner::DownloadTask;
use vfrtiles::state::{CompletionLedger, VersionStore};

// ============================================================================
// Fakes
// ============================================================================

/// Catalog whose listing can be changed between runs.
#[derive(Clone, Default)]
struct MutableCatalog {
    entries: Rc<RefCell<Vec<CatalogEntry>>>,
}

impl MutableCatalog {
    fn publish(&self, charts: &[(&str, u64)]) {
        *self.entries.borrow_mut() = charts
            .iter()
            .map(|(id, v)| {
                CatalogEntry::new(*id, format!("https://example.test/{}_{}.zip", id, v), *v)
            })
            .collect();
    }
}

impl RemoteCatalog for MutableCatalog {
    fn list_available(&self) -> CatalogResult<Vec<CatalogEntry>> {
        Ok(self.entries.borrow().clone())
    }
}

/// Writes "<identifier>@<version>" as the raw raster, failing for selected charts.
#[derive(Clone, Default)]
struct FakeFetcher {
    failing: Rc<RefCell<HashSet<String>>>,
    fetched: Rc<RefCell<Vec<String>>>,
}

impl FakeFetcher {
    fn fail_for(&self, identifier: &str) {
        self.failing.borrow_mut().insert(identifier.to_string());
    }

    fn recover(&self, identifier: &str) {
        self.failing.borrow_mut().remove(identifier);
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }
}

impl AssetFetcher for FakeFetcher {
    fn fetch(&self, task: &DownloadTask, raw_dir: &Path) -> FetchResult<PathBuf> {
        self.fetched.borrow_mut().push(task.to_string());
        if self.failing.borrow().contains(&task.identifier) {
            return Err(FetchError::HttpStatus {
                url: task.url.clone(),
                status: 500,
            });
        }

        let path = raw_dir.join(format!("{}.tif", task.identifier));
        fs::write(&path, format!("{}@{}", task.identifier, task.version)).map_err(|e| {
            FetchError::Io {
                path: path.clone(),
                source: e,
            }
        })?;
        Ok(path)
    }
}

/// Copies input to output and logs "<stage>:<artifact>".
struct CopyTransform {
    stage: StageKind,
    calls: Rc<RefCell<Vec<String>>>,
}

impl Transform for CopyTransform {
    fn name(&self) -> &str {
        "copy"
    }

    fn apply(&self, job: &TransformJob<'_>) -> Result<(), TransformError> {
        self.calls
            .borrow_mut()
            .push(format!("{}:{}", self.stage, job.artifact));
        fs::copy(job.input, job.output)
            .map(|_| ())
            .map_err(|e| TransformError::Other(e.to_string()))
    }
}

/// Records the inputs of every build and writes a single zoom level.
#[derive(Clone, Default)]
struct RecordingTiler {
    builds: Rc<RefCell<Vec<Vec<String>>>>,
}

impl RecordingTiler {
    fn build_count(&self) -> usize {
        self.builds.borrow().len()
    }

    fn last_inputs(&self) -> Vec<String> {
        self.builds.borrow().last().cloned().unwrap_or_default()
    }
}

impl TileSetBuilder for RecordingTiler {
    fn build(&self, inputs: &[PathBuf], layout: &WorkspaceLayout) -> Result<(), TransformError> {
        let mut names: Vec<String> = inputs
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        names.sort();
        self.builds.borrow_mut().push(names);
        fs::create_dir_all(layout.tiles_dir().join("0"))
            .map_err(|e| TransformError::Other(e.to_string()))
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

struct World {
    _temp: TempDir,
    layout: WorkspaceLayout,
    catalog: MutableCatalog,
    fetcher: FakeFetcher,
    tiler: RecordingTiler,
    calls: Rc<RefCell<Vec<String>>>,
}

impl World {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let layout = WorkspaceLayout::new(temp.path().join("tmp"), temp.path().join("tiles"));
        Self {
            _temp: temp,
            layout,
            catalog: MutableCatalog::default(),
            fetcher: FakeFetcher::default(),
            tiler: RecordingTiler::default(),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Build an orchestrator backed by the JSON state files of the workspace.
    fn orchestrator(&self) -> Orchestrator {
        let mut builder = Orchestrator::builder(self.layout.clone())
            .catalog(self.catalog.clone())
            .fetcher(self.fetcher.clone())
            .fan_out(FanOutRules::default())
            .tiler(self.tiler.clone());
        for stage in [StageKind::ColorExpanded, StageKind::Cropped, StageKind::Warped] {
            builder = builder.transform(
                stage,
                CopyTransform {
                    stage,
                    calls: self.calls.clone(),
                },
            );
        }
        builder.build().unwrap()
    }

    fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }

    fn artifact(&self, stage: StageKind, name: &str) -> PathBuf {
        self.layout.artifact_path(stage, name)
    }

    fn read(&self, stage: StageKind, name: &str) -> String {
        fs::read_to_string(self.artifact(stage, name)).unwrap()
    }
}

const STAGES: [StageKind; 4] = [
    StageKind::Raw,
    StageKind::ColorExpanded,
    StageKind::Cropped,
    StageKind::Warped,
];

fn processed(report: &RunReport, kind: StageKind) -> usize {
    report
        .stages
        .iter()
        .find(|s| s.kind == kind)
        .map(|s| s.processed)
        .unwrap_or(0)
}

// ============================================================================
// First ingest and reruns
// ============================================================================

#[test]
fn test_first_run_processes_every_stage() {
    let world = World::new();
    world.catalog.publish(&[("Seattle", 5), ("Denver", 3)]);
    let mut orchestrator = world.orchestrator();

    let report = orchestrator.run().unwrap();

    assert!(!report.has_failures(), "{}", report);
    assert_eq!(report.downloaded.len(), 2);
    for stage in STAGES {
        assert!(world.artifact(stage, "Seattle").is_file(), "{} missing", stage);
        assert!(world.artifact(stage, "Denver").is_file(), "{} missing", stage);
    }
    assert_eq!(world.read(StageKind::Warped, "Seattle"), "Seattle@5");
    assert_eq!(report.tile_set, Some(TileSetOutcome::Built { charts: 2 }));
    assert_eq!(orchestrator.ledger().tile_set().map(|f| f.len()), Some(2));
}

#[test]
fn test_rerun_without_changes_does_nothing() {
    let world = World::new();
    world.catalog.publish(&[("Seattle", 5)]);
    let mut orchestrator = world.orchestrator();
    orchestrator.run().unwrap();
    world.take_calls();

    let report = orchestrator.run().unwrap();

    assert!(report.downloaded.is_empty());
    assert_eq!(report.up_to_date, vec!["Seattle"]);
    assert!(world.take_calls().is_empty());
    assert_eq!(report.tile_set, Some(TileSetOutcome::UpToDate { charts: 1 }));
    assert_eq!(world.tiler.build_count(), 1);
    assert_eq!(world.fetcher.fetched(), vec!["Seattle (version 5)"]);
}

#[test]
fn test_state_survives_a_new_orchestrator() {
    let world = World::new();
    world.catalog.publish(&[("Seattle", 5)]);
    world.orchestrator().run().unwrap();
    world.take_calls();

    let mut reopened = world.orchestrator();
    let report = reopened.run().unwrap();

    assert!(report.downloaded.is_empty());
    assert!(world.take_calls().is_empty());
    assert_eq!(reopened.versions().get("Seattle"), Some(5));
    assert!(reopened.ledger().is_complete("Seattle", StageKind::Warped, 5));
}

// ============================================================================
// New editions
// ============================================================================

#[test]
fn test_new_edition_rebuilds_only_that_chart() {
    let world = World::new();
    world.catalog.publish(&[("Seattle", 5), ("Denver", 3)]);
    let mut orchestrator = world.orchestrator();
    orchestrator.run().unwrap();
    world.take_calls();

    world.catalog.publish(&[("Seattle", 6), ("Denver", 3)]);
    let report = orchestrator.run().unwrap();

    assert!(!report.has_failures(), "{}", report);
    assert_eq!(
        world.take_calls(),
        vec!["color-expanded:Seattle", "cropped:Seattle", "warped:Seattle"]
    );
    for stage in STAGES {
        assert_eq!(world.read(stage, "Seattle"), "Seattle@6", "stale {}", stage);
        assert_eq!(world.read(stage, "Denver"), "Denver@3");
    }
    assert_eq!(orchestrator.versions().get("Seattle"), Some(6));
    assert_eq!(processed(&report, StageKind::Warped), 1);
    assert_eq!(report.tile_set, Some(TileSetOutcome::Built { charts: 2 }));
    assert_eq!(world.tiler.build_count(), 2);
}

#[test]
fn test_new_edition_state_walks_back_to_tiled() {
    let world = World::new();
    world.catalog.publish(&[("Seattle", 5)]);
    let mut orchestrator = world.orchestrator();
    orchestrator.run().unwrap();

    let status = orchestrator.status().unwrap();
    assert_eq!(status[0].state, AssetState::Tiled);

    world.catalog.publish(&[("Seattle", 6)]);
    orchestrator.run().unwrap();

    let status = orchestrator.status().unwrap();
    assert_eq!(status[0].version, Some(6));
    assert_eq!(status[0].state, AssetState::Tiled);
}

// ============================================================================
// Failed downloads
// ============================================================================

#[test]
fn test_failed_download_of_new_chart_leaves_no_trace() {
    let world = World::new();
    world.catalog.publish(&[("Seattle", 5), ("Denver", 3)]);
    world.fetcher.fail_for("Denver");
    let mut orchestrator = world.orchestrator();

    let report = orchestrator.run().unwrap();

    assert!(report.has_failures());
    assert_eq!(report.failed_downloads.len(), 1);
    assert_eq!(report.failed_downloads[0].identifier, "Denver");
    assert!(report.failed_downloads[0].reason.contains("500"));
    for stage in STAGES {
        assert!(!world.artifact(stage, "Denver").exists());
        assert!(world.artifact(stage, "Seattle").is_file());
    }
    assert_eq!(orchestrator.versions().get("Denver"), None);
    assert_eq!(report.tile_set, Some(TileSetOutcome::Built { charts: 1 }));
}

#[test]
fn test_failed_download_of_new_edition_keeps_recorded_version() {
    let world = World::new();
    world.catalog.publish(&[("Seattle", 5)]);
    let mut orchestrator = world.orchestrator();
    orchestrator.run().unwrap();

    world.catalog.publish(&[("Seattle", 6)]);
    world.fetcher.fail_for("Seattle");
    let report = orchestrator.run().unwrap();

    assert!(report.has_failures());
    assert_eq!(orchestrator.versions().get("Seattle"), Some(5));
    for stage in STAGES {
        assert!(!world.artifact(stage, "Seattle").exists(), "{} left behind", stage);
    }

    world.fetcher.recover("Seattle");
    let report = orchestrator.run().unwrap();

    assert!(!report.has_failures(), "{}", report);
    assert_eq!(orchestrator.versions().get("Seattle"), Some(6));
    assert_eq!(world.read(StageKind::Warped, "Seattle"), "Seattle@6");
}

#[test]
fn test_older_edition_never_replaces_recorded_one() {
    let world = World::new();
    world.catalog.publish(&[("Seattle", 6)]);
    let mut orchestrator = world.orchestrator();
    orchestrator.run().unwrap();
    orchestrator.invalidate("Seattle").unwrap();
    world.take_calls();

    // The catalog rolls back to an older edition while the raw file is missing.
    world.catalog.publish(&[("Seattle", 5)]);
    let report = orchestrator.run().unwrap();

    assert!(report.has_failures());
    assert!(report.downloaded.is_empty());
    assert!(report.failed_downloads[0].reason.contains("below recorded version 6"));
    assert!(world.take_calls().is_empty());
    for stage in STAGES {
        assert!(!world.artifact(stage, "Seattle").exists(), "{} left behind", stage);
    }
    assert_eq!(orchestrator.versions().get("Seattle"), Some(6));
    assert!(!orchestrator.ledger().is_complete("Seattle", StageKind::Warped, 6));

    world.catalog.publish(&[("Seattle", 6)]);
    let report = orchestrator.run().unwrap();

    assert!(!report.has_failures(), "{}", report);
    assert_eq!(world.read(StageKind::Warped, "Seattle"), "Seattle@6");
}

// ============================================================================
// Split charts
// ============================================================================

#[test]
fn test_split_chart_fans_out_and_invalidates_all_parts() {
    let world = World::new();
    world.catalog.publish(&[("Western_Aleutian_Islands", 1)]);
    let mut orchestrator = world.orchestrator();

    orchestrator.run().unwrap();

    assert!(world.artifact(StageKind::ColorExpanded, "Western_Aleutian_Islands").is_file());
    for part in ["Western_Aleutian_Islands_East", "Western_Aleutian_Islands_West"] {
        assert!(world.artifact(StageKind::Cropped, part).is_file());
        assert!(world.artifact(StageKind::Warped, part).is_file());
    }
    assert!(!world.artifact(StageKind::Cropped, "Western_Aleutian_Islands").exists());
    assert_eq!(
        world.tiler.last_inputs(),
        vec!["Western_Aleutian_Islands_East.tif", "Western_Aleutian_Islands_West.tif"]
    );

    world.catalog.publish(&[("Western_Aleutian_Islands", 2)]);
    world.fetcher.fail_for("Western_Aleutian_Islands");
    orchestrator.run().unwrap();

    for stage in [StageKind::Cropped, StageKind::Warped] {
        for part in ["Western_Aleutian_Islands_East", "Western_Aleutian_Islands_West"] {
            assert!(!world.artifact(stage, part).exists());
        }
    }
}

// ============================================================================
// Tile set
// ============================================================================

#[test]
fn test_tiles_rebuilt_when_tiles_dir_is_emptied() {
    let world = World::new();
    world.catalog.publish(&[("Seattle", 5)]);
    let mut orchestrator = world.orchestrator();
    orchestrator.run().unwrap();

    fs::remove_dir_all(world.layout.tiles_dir().join("0")).unwrap();
    let report = orchestrator.run().unwrap();

    assert_eq!(report.tile_set, Some(TileSetOutcome::Built { charts: 1 }));
    assert_eq!(world.tiler.build_count(), 2);
}

#[test]
fn test_manual_invalidation_rebuilds_at_same_version() {
    let world = World::new();
    world.catalog.publish(&[("Seattle", 5)]);
    let mut orchestrator = world.orchestrator();
    orchestrator.run().unwrap();
    world.take_calls();

    let removed = orchestrator.invalidate("Seattle").unwrap();
    assert_eq!(removed.len(), 4);
    let ledger = CompletionLedger::open(world.layout.ledger_path()).unwrap();
    assert!(!ledger.is_complete("Seattle", StageKind::Warped, 5));

    let report = orchestrator.run().unwrap();

    assert_eq!(report.downloaded.len(), 1);
    assert_eq!(world.take_calls().len(), 3);
    assert_eq!(orchestrator.versions().get("Seattle"), Some(5));
    assert_eq!(world.read(StageKind::Warped, "Seattle"), "Seattle@5");
}
