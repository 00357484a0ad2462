//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let fan_out: String = config
        .fan_out
        .rules
        .iter()
        .map(|(chart, parts)| format!("{} = {}\n", chart, parts.join(", ")))
        .collect();

    format!(
        r#"[catalog]
; Listing page of the current VFR sectional chart editions
url = {}

[paths]
; Intermediate stage directories, version index and completion ledger
work_dir = {}
; Published TMS tile pyramid (<zoom>/<x>/<y>.png)
tiles_dir = {}
; One <chart>.shp clipping shape per chart or chart part
clipping_shapes_dir = {}
; Directory containing gdal_tiler.py from tilers-tools
tilers_tools_dir = {}

[tiles]
; Zoom levels to generate (inclusive)
min_zoom = {}
max_zoom = {}

[download]
; Request timeout in seconds
timeout = {}

[tools]
; Python interpreter used to run gdal_tiler.py
python = {}

[fan_out]
; Charts cut into several parts by the crop stage: <chart> = <part>, <part>
; Each part needs its own clipping shape. Leave the section empty to disable.
{}"#,
        config.catalog.url,
        path_to_string(&config.paths.work_dir),
        path_to_string(&config.paths.tiles_dir),
        path_to_string(&config.paths.clipping_shapes_dir),
        path_to_string(&config.paths.tilers_tools_dir),
        config.tiles.min_zoom,
        config.tiles.max_zoom,
        config.download.timeout,
        config.tools.python,
        fan_out,
    )
}

/// Convert a path to a string, collapsing the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
