//! On-disk layout of the work and tiles directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::stage::StageKind;

/// File extension of every stage artifact.
pub const ARTIFACT_EXTENSION: &str = "tif";

const INTERMEDIATE_TILES_DIR: &str = "05_intermediate_tiles";
const VERSION_INDEX_FILE: &str = "version_index.json";
const LEDGER_FILE: &str = "completion_ledger.json";
const VRT_FILE: &str = "merged_sectionals.vrt";

/// Hidden name of an artifact while it is being written.
pub fn partial_file_name(name: &str) -> String {
    format!(".{}.partial.{}", name, ARTIFACT_EXTENSION)
}

/// Hidden name of a chart archive while it is downloaded into the raw stage.
pub fn download_file_name(identifier: &str) -> String {
    format!(".{}.download.zip", identifier)
}

/// Locations of every directory and state file used by a run.
///
/// ```text
/// <work_dir>/
/// ├── 01_raw/<chart>.tif           (.<chart>.download.zip while fetching)
/// ├── 02_rgba/<chart>.tif
/// ├── 03_cropped/<chart or part>.tif
/// ├── 04_warped/<chart or part>.tif
/// ├── 05_intermediate_tiles/
/// ├── merged_sectionals.vrt
/// ├── version_index.json
/// └── completion_ledger.json
/// <tiles_dir>/<zoom>/<x>/<y>.png
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    work_dir: PathBuf,
    tiles_dir: PathBuf,
}

impl WorkspaceLayout {
    /// Create a layout rooted at the given directories.
    pub fn new(work_dir: impl Into<PathBuf>, tiles_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            tiles_dir: tiles_dir.into(),
        }
    }

    /// Root of the intermediate state.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Final tile output directory.
    pub fn tiles_dir(&self) -> &Path {
        &self.tiles_dir
    }

    /// Directory of a stage.
    pub fn stage_dir(&self, stage: StageKind) -> PathBuf {
        self.work_dir.join(stage.dir_name())
    }

    /// Final path of an artifact.
    pub fn artifact_path(&self, stage: StageKind, name: &str) -> PathBuf {
        self.stage_dir(stage).join(format!("{}.{}", name, ARTIFACT_EXTENSION))
    }

    /// Scratch path a transform writes to before the artifact is published.
    ///
    /// Hidden files are never listed as stage inputs.
    pub fn partial_path(&self, stage: StageKind, name: &str) -> PathBuf {
        self.stage_dir(stage).join(partial_file_name(name))
    }

    /// Scratch path of a chart archive during download.
    pub fn download_path(&self, identifier: &str) -> PathBuf {
        self.stage_dir(StageKind::Raw).join(download_file_name(identifier))
    }

    /// Scratch directory of the tiler.
    pub fn intermediate_tiles_dir(&self) -> PathBuf {
        self.work_dir.join(INTERMEDIATE_TILES_DIR)
    }

    /// Virtual mosaic of all warped charts.
    pub fn vrt_path(&self) -> PathBuf {
        self.work_dir.join(VRT_FILE)
    }

    /// Version index file.
    pub fn version_index_path(&self) -> PathBuf {
        self.work_dir.join(VERSION_INDEX_FILE)
    }

    /// Completion ledger file.
    pub fn ledger_path(&self) -> PathBuf {
        self.work_dir.join(LEDGER_FILE)
    }

    /// Create every directory of the layout.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.tiles_dir)?;
        for stage in StageKind::ALL {
            fs::create_dir_all(self.stage_dir(stage))?;
        }
        fs::create_dir_all(self.intermediate_tiles_dir())
    }

    /// Whether the tiles directory holds at least one zoom level.
    pub fn tiles_present(&self) -> bool {
        zoom_dirs(&self.tiles_dir)
            .map(|dirs| !dirs.is_empty())
            .unwrap_or(false)
    }

    /// Artifact names (file stems) published in a stage directory, sorted.
    ///
    /// A missing directory is treated as empty.
    pub fn list_artifacts(&self, stage: StageKind) -> io::Result<Vec<String>> {
        let dir = self.stage_dir(stage);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = artifact_stem(&entry.path()) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Stem of an eligible artifact file: visible and with the artifact extension.
fn artifact_stem(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?;
    if !extension.eq_ignore_ascii_case(ARTIFACT_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.starts_with('.') {
        return None;
    }
    Some(stem.to_string())
}

/// Zoom level directories (numeric names) directly under `dir`.
pub(crate) fn zoom_dirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_zoom = entry
            .file_name()
            .to_str()
            .map(|name| name.parse::<u8>().is_ok())
            .unwrap_or(false);
        if is_zoom && entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}
