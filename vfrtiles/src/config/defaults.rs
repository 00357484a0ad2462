//! Default values for every configuration setting.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::catalog::DEFAULT_CATALOG_URL;
use crate::pipeline::FanOutRules;

/// Default lowest zoom level of the tile pyramid.
pub const DEFAULT_MIN_ZOOM: u8 = 0;

/// Default highest zoom level of the tile pyramid.
pub const DEFAULT_MAX_ZOOM: u8 = 2;

/// Highest zoom level accepted in the configuration.
pub const MAX_ZOOM_LEVEL: u8 = 22;

/// Default download timeout in seconds.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Default Python interpreter.
pub const DEFAULT_PYTHON: &str = "python";

/// Default work directory (`~/.vfrtiles/tmp`).
pub fn default_work_dir() -> PathBuf {
    config_directory().join("tmp")
}

/// Default tiles directory (`~/.vfrtiles/tiles`).
pub fn default_tiles_dir() -> PathBuf {
    config_directory().join("tiles")
}

/// Default clipping shapes directory (`~/.vfrtiles/assets/clipping_shapes`).
pub fn default_clipping_shapes_dir() -> PathBuf {
    config_directory().join("assets").join("clipping_shapes")
}

/// Default tilers-tools directory (`~/.vfrtiles/tilers_tools`).
pub fn default_tilers_tools_dir() -> PathBuf {
    config_directory().join("tilers_tools")
}

impl Default for ConfigFile {
    fn default() -> Self {
        let rules: BTreeMap<String, Vec<String>> = FanOutRules::default()
            .iter()
            .map(|(chart, parts)| (chart.to_string(), parts.to_vec()))
            .collect();

        Self {
            catalog: CatalogSettings {
                url: DEFAULT_CATALOG_URL.to_string(),
            },
            paths: PathSettings {
                work_dir: default_work_dir(),
                tiles_dir: default_tiles_dir(),
                clipping_shapes_dir: default_clipping_shapes_dir(),
                tilers_tools_dir: default_tilers_tools_dir(),
            },
            tiles: TileSettings {
                min_zoom: DEFAULT_MIN_ZOOM,
                max_zoom: DEFAULT_MAX_ZOOM,
            },
            download: DownloadSettings {
                timeout: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            },
            tools: ToolSettings {
                python: DEFAULT_PYTHON.to_string(),
            },
            fan_out: FanOutSettings { rules },
        }
    }
}
