//! CLI runner for common setup.
//!
//! Loads the configuration, initializes logging, and assembles the
//! orchestrator from the configured components.

use std::path::{Path, PathBuf};

use tracing::info;
use vfrtiles::catalog::FaaSectionalCatalog;
use vfrtiles::config::{config_file_path, ConfigFile};
use vfrtiles::fetch::HttpFetcher;
use vfrtiles::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard};
use vfrtiles::orchestrator::Orchestrator;
use vfrtiles::pipeline::{ColorExpand, CutlineCrop, GdalTiler, Reproject, StageKind};

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    config: ConfigFile,
    config_path: PathBuf,
}

impl CliRunner {
    /// Load the configuration (defaults if the file is absent) and start logging.
    pub fn new(config_path: Option<&Path>) -> Result<Self, CliError> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(config_file_path);
        let config = ConfigFile::load_from(&config_path)?;

        let logging_guard = init_logging(&default_log_dir(), default_log_file())
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
            config_path,
        })
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("vfrtiles v{}", env!("CARGO_PKG_VERSION"));
        info!(
            config = %self.config_path.display(),
            work_dir = %self.config.paths.work_dir.display(),
            "vfrtiles CLI: {} command",
            command
        );
    }

    /// Build an orchestrator with the FAA catalog, the HTTP fetcher, and
    /// the GDAL transforms.
    pub fn orchestrator(&self) -> Result<Orchestrator, CliError> {
        let config = &self.config;
        let timeout = config.download_timeout();

        let catalog = FaaSectionalCatalog::with_url(config.catalog.url.clone(), timeout)?;
        let fetcher = HttpFetcher::with_timeout(timeout)?;
        let tiler = GdalTiler::new(
            config.tools.python.clone(),
            config.paths.tilers_tools_dir.clone(),
            config.tiles.min_zoom,
            config.tiles.max_zoom,
        );

        let orchestrator = Orchestrator::builder(config.layout())
            .catalog(catalog)
            .fetcher(fetcher)
            .fan_out(config.fan_out_rules())
            .transform(StageKind::ColorExpanded, ColorExpand)
            .transform(
                StageKind::Cropped,
                CutlineCrop::new(config.paths.clipping_shapes_dir.clone()),
            )
            .transform(StageKind::Warped, Reproject::default())
            .tiler(tiler)
            .build()?;

        Ok(orchestrator)
    }
}
