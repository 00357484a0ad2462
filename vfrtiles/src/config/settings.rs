//! Configuration settings structs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::pipeline::{FanOutRules, WorkspaceLayout};

/// Complete configuration, as loaded from `config.ini`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub catalog: CatalogSettings,
    pub paths: PathSettings,
    pub tiles: TileSettings,
    pub download: DownloadSettings,
    pub tools: ToolSettings,
    pub fan_out: FanOutSettings,
}

/// `[catalog]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    /// Listing page of the published charts.
    pub url: String,
}

/// `[paths]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSettings {
    /// Intermediate stage directories and state files.
    pub work_dir: PathBuf,
    /// Published tile pyramid.
    pub tiles_dir: PathBuf,
    /// One `<chart or part>.shp` per chart.
    pub clipping_shapes_dir: PathBuf,
    /// Checkout of tilers-tools holding `gdal_tiler.py`.
    pub tilers_tools_dir: PathBuf,
}

/// `[tiles]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSettings {
    pub min_zoom: u8,
    pub max_zoom: u8,
}

/// `[download]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Request timeout in seconds, for both the catalog and the archives.
    pub timeout: u64,
}

/// `[tools]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Python interpreter used to run `gdal_tiler.py`.
    pub python: String,
}

/// `[fan_out]`: `<chart> = <part>, <part>, ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutSettings {
    pub rules: BTreeMap<String, Vec<String>>,
}

impl ConfigFile {
    /// Workspace layout described by `[paths]`.
    pub fn layout(&self) -> WorkspaceLayout {
        WorkspaceLayout::new(&self.paths.work_dir, &self.paths.tiles_dir)
    }

    /// Fan-out rules described by `[fan_out]`.
    pub fn fan_out_rules(&self) -> FanOutRules {
        self.fan_out
            .rules
            .iter()
            .fold(FanOutRules::empty(), |rules, (chart, parts)| {
                rules.with_rule(chart.clone(), parts.iter().cloned())
            })
    }

    /// Download timeout.
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download.timeout)
    }
}
