//! End-to-end update runs.
//!
//! The orchestrator ties the components together in a fixed order:
//!
//! 1. list the remote catalog
//! 2. plan downloads against the version store and the raw stage
//! 3. per task: invalidate the chart's artifacts, download it, record the
//!    new version
//! 4. run every per-chart stage
//! 5. refresh the tile set
//!
//! Everything runs sequentially on the calling thread. Only state store
//! failures and failed invalidations abort a run; everything else is
//! logged, reported, and retried on the next run.

mod error;
mod report;

pub use error::RunError;
pub use report::{AssetStatus, DownloadFailure, RunReport};

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::catalog::{CatalogEntry, CatalogResult, RemoteCatalog};
use crate::fetch::AssetFetcher;
use crate::pipeline::{
    FanOutRules, InvalidationCascade, StageKind, StagePipeline, TileSet, TileSetBuilder,
    Transform, WorkspaceLayout,
};
use crate::planner::{plan_updates, Plan};
use crate::state::{CompletionLedger, JsonVersionStore, VersionStore};

/// Runs incremental updates over one workspace.
pub struct Orchestrator {
    layout: WorkspaceLayout,
    catalog: Box<dyn RemoteCatalog>,
    fetcher: Box<dyn AssetFetcher>,
    versions: Box<dyn VersionStore>,
    ledger: CompletionLedger,
    cascade: InvalidationCascade,
    pipeline: StagePipeline,
    tile_set: Option<TileSet>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("layout", &self.layout)
            .field("pipeline", &self.pipeline)
            .field("tile_set", &self.tile_set)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Start building an orchestrator over `layout`.
    pub fn builder(layout: WorkspaceLayout) -> OrchestratorBuilder {
        OrchestratorBuilder::new(layout)
    }

    /// Workspace layout.
    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Version store.
    pub fn versions(&self) -> &dyn VersionStore {
        self.versions.as_ref()
    }

    /// Completion ledger.
    pub fn ledger(&self) -> &CompletionLedger {
        &self.ledger
    }

    /// Fan-out rules in effect.
    pub fn fan_out(&self) -> &FanOutRules {
        self.pipeline.fan_out()
    }

    /// Perform one complete update run.
    ///
    /// # Errors
    ///
    /// Returns an error only for state store failures and failed
    /// invalidations. Everything else ends up in the report.
    pub fn run(&mut self) -> Result<RunReport, RunError> {
        info!(work_dir = %self.layout.work_dir().display(), "Starting update run");
        let mut report = RunReport::default();

        let entries = match self.catalog.list_available() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Catalog unavailable, continuing with local charts");
                report.catalog_error = Some(e.to_string());
                Vec::new()
            }
        };

        let plan = self.plan_entries(&entries);
        report.up_to_date = plan.up_to_date.clone();
        info!(
            downloads = plan.tasks.len(),
            up_to_date = plan.up_to_date.len(),
            "Download plan ready"
        );

        let raw_dir = self.layout.stage_dir(StageKind::Raw);
        for task in plan.tasks {
            self.cascade.invalidate(&task.identifier, &mut self.ledger)?;

            match self.fetcher.fetch(&task, &raw_dir) {
                Ok(path) => {
                    if self.versions.set(&task.identifier, task.version)? {
                        info!(
                            chart = %task.identifier,
                            version = task.version,
                            path = %path.display(),
                            "Chart downloaded"
                        );
                        report.downloaded.push(task);
                        continue;
                    }

                    // Artifacts must match the recorded version, so an older
                    // edition cannot stay in the raw stage.
                    self.cascade.invalidate(&task.identifier, &mut self.ledger)?;
                    let recorded = self.versions.get(&task.identifier).unwrap_or_default();
                    let reason = format!(
                        "catalog version {} is below recorded version {}",
                        task.version, recorded
                    );
                    warn!(chart = %task.identifier, reason = %reason, "Downloaded chart discarded");
                    report.failed_downloads.push(DownloadFailure {
                        identifier: task.identifier,
                        version: task.version,
                        reason,
                    });
                }
                Err(e) => {
                    warn!(chart = %task.identifier, version = task.version, error = %e, "Download failed");
                    report.failed_downloads.push(DownloadFailure {
                        identifier: task.identifier,
                        version: task.version,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.stages = self
            .pipeline
            .run_all(self.versions.as_ref(), &mut self.ledger)?;

        if let Some(tile_set) = &self.tile_set {
            let outcome = tile_set.refresh(
                &self.layout,
                self.pipeline.fan_out(),
                self.versions.as_ref(),
                &mut self.ledger,
            )?;
            report.tile_set = Some(outcome);
        }

        info!(failures = report.has_failures(), "Update run finished");
        Ok(report)
    }

    /// List the catalog and plan downloads without changing anything.
    pub fn plan_only(&self) -> CatalogResult<Plan> {
        let entries = self.catalog.list_available()?;
        Ok(self.plan_entries(&entries))
    }

    /// Derived state of every known chart, sorted by identifier.
    ///
    /// Known charts are those with a recorded version or a raw artifact.
    pub fn status(&self) -> Result<Vec<AssetStatus>, RunError> {
        let raw = self
            .layout
            .list_artifacts(StageKind::Raw)
            .map_err(|e| RunError::Layout {
                path: self.layout.stage_dir(StageKind::Raw),
                source: e,
            })?;

        let mut known: BTreeSet<String> = self.versions.identifiers().into_iter().collect();
        known.extend(raw);

        Ok(known
            .into_iter()
            .map(|identifier| {
                let state =
                    self.pipeline
                        .asset_state(&identifier, self.versions.as_ref(), &self.ledger);
                AssetStatus {
                    version: self.versions.get(&identifier),
                    identifier,
                    state,
                }
            })
            .collect())
    }

    /// Drop every artifact of a chart so the next run downloads and
    /// processes it again. The recorded version is kept.
    pub fn invalidate(&mut self, identifier: &str) -> Result<Vec<PathBuf>, RunError> {
        Ok(self.cascade.invalidate(identifier, &mut self.ledger)?)
    }

    fn plan_entries(&self, entries: &[CatalogEntry]) -> Plan {
        let layout = &self.layout;
        plan_updates(entries, self.versions.as_ref(), |id| {
            layout.artifact_path(StageKind::Raw, id).is_file()
        })
    }
}

/// Builder for [`Orchestrator`].
///
/// The catalog and fetcher are required. The version store and ledger
/// default to the JSON files of the layout, fan-out rules to
/// [`FanOutRules::default`], and without a tiler the tile set step is
/// skipped.
pub struct OrchestratorBuilder {
    layout: WorkspaceLayout,
    catalog: Option<Box<dyn RemoteCatalog>>,
    fetcher: Option<Box<dyn AssetFetcher>>,
    versions: Option<Box<dyn VersionStore>>,
    ledger: Option<CompletionLedger>,
    fan_out: FanOutRules,
    transforms: Vec<(StageKind, Box<dyn Transform>)>,
    tiler: Option<Box<dyn TileSetBuilder>>,
}

impl OrchestratorBuilder {
    fn new(layout: WorkspaceLayout) -> Self {
        Self {
            layout,
            catalog: None,
            fetcher: None,
            versions: None,
            ledger: None,
            fan_out: FanOutRules::default(),
            transforms: Vec::new(),
            tiler: None,
        }
    }

    pub fn catalog(mut self, catalog: impl RemoteCatalog + 'static) -> Self {
        self.catalog = Some(Box::new(catalog));
        self
    }

    pub fn fetcher(mut self, fetcher: impl AssetFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// Use a specific version store instead of `version_index.json`.
    pub fn versions(mut self, versions: impl VersionStore + 'static) -> Self {
        self.versions = Some(Box::new(versions));
        self
    }

    /// Use a specific ledger instead of `completion_ledger.json`.
    pub fn ledger(mut self, ledger: CompletionLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn fan_out(mut self, fan_out: FanOutRules) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Register the transform of a stage.
    pub fn transform(mut self, kind: StageKind, transform: impl Transform + 'static) -> Self {
        self.transforms.push((kind, Box::new(transform)));
        self
    }

    pub fn tiler(mut self, tiler: impl TileSetBuilder + 'static) -> Self {
        self.tiler = Some(Box::new(tiler));
        self
    }

    /// Create the workspace directories, open the state files, and build.
    ///
    /// # Errors
    ///
    /// Fails if a required component is missing, the directories cannot be
    /// created, or a state file is corrupt.
    pub fn build(self) -> Result<Orchestrator, RunError> {
        let catalog = self.catalog.ok_or(RunError::Incomplete("catalog"))?;
        let fetcher = self.fetcher.ok_or(RunError::Incomplete("fetcher"))?;

        self.layout.ensure_dirs().map_err(|e| RunError::Layout {
            path: self.layout.work_dir().to_path_buf(),
            source: e,
        })?;

        let versions = match self.versions {
            Some(versions) => versions,
            None => Box::new(JsonVersionStore::open(self.layout.version_index_path())?),
        };
        let ledger = match self.ledger {
            Some(ledger) => ledger,
            None => CompletionLedger::open(self.layout.ledger_path())?,
        };

        let mut pipeline = StagePipeline::new(self.layout.clone(), self.fan_out.clone());
        for (kind, transform) in self.transforms {
            pipeline.set_stage(kind, transform);
        }

        Ok(Orchestrator {
            cascade: InvalidationCascade::new(self.layout.clone(), self.fan_out),
            layout: self.layout,
            catalog,
            fetcher,
            versions,
            ledger,
            pipeline,
            tile_set: self.tiler.map(TileSet::new),
        })
    }
}
