//! GDAL-backed transforms.
//!
//! Each transform shells out to a GDAL command line tool, the same way the
//! charts have always been processed by hand:
//!
//! | Stage          | Tool                                   |
//! |----------------|----------------------------------------|
//! | color-expanded | `gdal_translate -expand rgba`          |
//! | cropped        | `gdalwarp -cutline <shape> -crop_to_cutline` |
//! | warped         | `gdalwarp -r lanczos -t_srs EPSG:4326` |
//! | tile set       | `gdalbuildvrt` + `gdal_tiler.py`       |

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::layout::{zoom_dirs, WorkspaceLayout};
use super::tileset::TileSetBuilder;
use super::transform::{Transform, TransformError, TransformJob};

/// Run an external tool to completion.
fn run_tool<I, S>(program: &str, args: I) -> Result<(), TransformError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args);
    debug!(command = ?command, "Running external tool");

    let output = command.output().map_err(|e| TransformError::Spawn {
        program: program.to_string(),
        source: e,
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TransformError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(())
}

/// Expands paletted charts to RGBA so they can be warped and merged.
#[derive(Debug, Clone, Default)]
pub struct ColorExpand;

impl Transform for ColorExpand {
    fn name(&self) -> &str {
        "gdal_translate"
    }

    fn apply(&self, job: &TransformJob<'_>) -> Result<(), TransformError> {
        run_tool(
            "gdal_translate",
            [
                OsStr::new("-expand"),
                OsStr::new("rgba"),
                OsStr::new("-of"),
                OsStr::new("GTiff"),
                job.input.as_os_str(),
                job.output.as_os_str(),
            ],
        )
    }
}

/// Cuts away the legend and border along a per-chart clipping shape.
///
/// The shapefile is looked up by artifact name, so each part of a split
/// chart is cut with its own shape.
#[derive(Debug, Clone)]
pub struct CutlineCrop {
    shapes_dir: PathBuf,
}

impl CutlineCrop {
    /// Create a crop transform reading `<artifact>.shp` from `shapes_dir`.
    pub fn new(shapes_dir: impl Into<PathBuf>) -> Self {
        Self {
            shapes_dir: shapes_dir.into(),
        }
    }

    /// Clipping shape used for an artifact.
    pub fn shape_path(&self, artifact: &str) -> PathBuf {
        self.shapes_dir.join(format!("{}.shp", artifact))
    }
}

impl Transform for CutlineCrop {
    fn name(&self) -> &str {
        "gdalwarp (crop)"
    }

    fn apply(&self, job: &TransformJob<'_>) -> Result<(), TransformError> {
        let shape = self.shape_path(job.artifact);
        if !shape.exists() {
            return Err(TransformError::Other(format!(
                "no clipping shape for {} at {}",
                job.artifact,
                shape.display()
            )));
        }

        run_tool(
            "gdalwarp",
            [
                OsStr::new("-dstnodata"),
                OsStr::new("0"),
                OsStr::new("-q"),
                OsStr::new("-cutline"),
                shape.as_os_str(),
                OsStr::new("-crop_to_cutline"),
                OsStr::new("-of"),
                OsStr::new("GTiff"),
                job.input.as_os_str(),
                job.output.as_os_str(),
            ],
        )
    }
}

/// Reprojects a chart into the tile projection.
#[derive(Debug, Clone)]
pub struct Reproject {
    target_srs: String,
    resampling: String,
}

impl Default for Reproject {
    fn default() -> Self {
        Self {
            target_srs: "EPSG:4326".to_string(),
            resampling: "lanczos".to_string(),
        }
    }
}

impl Reproject {
    /// Reproject into `target_srs` with the given resampling method.
    pub fn new(target_srs: impl Into<String>, resampling: impl Into<String>) -> Self {
        Self {
            target_srs: target_srs.into(),
            resampling: resampling.into(),
        }
    }
}

impl Transform for Reproject {
    fn name(&self) -> &str {
        "gdalwarp (reproject)"
    }

    fn apply(&self, job: &TransformJob<'_>) -> Result<(), TransformError> {
        run_tool(
            "gdalwarp",
            [
                OsStr::new("-r"),
                OsStr::new(&self.resampling),
                OsStr::new("-t_srs"),
                OsStr::new(&self.target_srs),
                job.input.as_os_str(),
                job.output.as_os_str(),
            ],
        )
    }
}

/// Builds the TMS tile pyramid with `gdalbuildvrt` and tilers-tools.
#[derive(Debug, Clone)]
pub struct GdalTiler {
    python: String,
    tilers_tools_dir: PathBuf,
    min_zoom: u8,
    max_zoom: u8,
}

impl GdalTiler {
    /// Create a tiler running `gdal_tiler.py` from `tilers_tools_dir`.
    pub fn new(
        python: impl Into<String>,
        tilers_tools_dir: impl Into<PathBuf>,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Self {
        Self {
            python: python.into(),
            tilers_tools_dir: tilers_tools_dir.into(),
            min_zoom,
            max_zoom,
        }
    }

    /// Comma separated zoom list for `--zoom`.
    fn zoom_arg(&self) -> String {
        let zooms: Vec<String> = (self.min_zoom..=self.max_zoom)
            .map(|z| z.to_string())
            .collect();
        format!("--zoom={}", zooms.join(","))
    }
}

impl TileSetBuilder for GdalTiler {
    fn build(&self, inputs: &[PathBuf], layout: &WorkspaceLayout) -> Result<(), TransformError> {
        let io_err = |path: &Path, source: io::Error| TransformError::Publish {
            path: path.to_path_buf(),
            source,
        };

        // Old zoom levels go, anything else in the tiles dir (e.g. a viewer page) stays.
        let tiles_dir = layout.tiles_dir();
        fs::create_dir_all(tiles_dir).map_err(|e| io_err(tiles_dir, e))?;
        for dir in zoom_dirs(tiles_dir).map_err(|e| io_err(tiles_dir, e))? {
            fs::remove_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }

        let scratch = layout.intermediate_tiles_dir();
        if scratch.exists() {
            fs::remove_dir_all(&scratch).map_err(|e| io_err(&scratch, e))?;
        }
        fs::create_dir_all(&scratch).map_err(|e| io_err(&scratch, e))?;

        let vrt = layout.vrt_path();
        match fs::remove_file(&vrt) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(io_err(&vrt, e)),
            _ => {}
        }

        let mut vrt_args = vec![vrt.as_os_str()];
        vrt_args.extend(inputs.iter().map(|p| p.as_os_str()));
        run_tool("gdalbuildvrt", vrt_args)?;

        let script = self.tilers_tools_dir.join("gdal_tiler.py");
        let dest_arg = format!("--dest-dir={}", scratch.display());
        run_tool(
            &self.python,
            [
                script.as_os_str(),
                OsStr::new("--profile=tms"),
                OsStr::new("--release"),
                OsStr::new("--paletted"),
                OsStr::new(&self.zoom_arg()),
                OsStr::new(&dest_arg),
                vrt.as_os_str(),
            ],
        )?;

        let stem = vrt
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("merged_sectionals");
        let pyramid = scratch.join(format!("{}.tms", stem));
        for zoom in self.min_zoom..=self.max_zoom {
            let source = pyramid.join(zoom.to_string());
            if !source.is_dir() {
                return Err(TransformError::MissingOutput(source));
            }
            let target = tiles_dir.join(zoom.to_string());
            copy_dir_recursive(&source, &target).map_err(|e| io_err(&target, e))?;
        }

        Ok(())
    }
}

/// Recursively copy a directory tree.
fn copy_dir_recursive(source: &Path, target: &Path) -> io::Result<()> {
    fs::create_dir_all(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let dest = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}
