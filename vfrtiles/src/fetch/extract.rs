//! GeoTIFF extraction from chart archives.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use super::error::{FetchError, FetchResult};
use crate::pipeline::{partial_file_name, ARTIFACT_EXTENSION};

/// Extract the first `.tif` entry of `archive` to `<raw_dir>/<identifier>.tif`.
///
/// The entry is written to `.<identifier>.partial.tif` in `raw_dir` and
/// renamed into place, so the artifact appears only once fully extracted.
/// A partial file left by an earlier, interrupted extraction is overwritten.
/// Other entries (world files, metadata) are ignored.
pub fn extract_raster(archive: &Path, raw_dir: &Path, identifier: &str) -> FetchResult<PathBuf> {
    let io_err = |path: &Path, source: io::Error| FetchError::Io {
        path: path.to_path_buf(),
        source,
    };
    let archive_err = |reason: zip::result::ZipError| FetchError::Archive {
        path: archive.to_path_buf(),
        reason: reason.to_string(),
    };

    let file = File::open(archive).map_err(|e| io_err(archive, e))?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(archive_err)?;

    let mut found = None;
    for i in 0..zip.len() {
        let entry = zip.by_index(i).map_err(archive_err)?;
        if is_raster_entry(entry.name()) {
            found = Some(i);
            break;
        }
    }
    let index = found.ok_or_else(|| FetchError::NoRaster {
        path: archive.to_path_buf(),
    })?;

    let mut entry = zip.by_index(index).map_err(archive_err)?;
    debug!(entry = entry.name(), chart = %identifier, "Extracting raster");

    let target = raw_dir.join(format!("{}.{}", identifier, ARTIFACT_EXTENSION));
    let partial = raw_dir.join(partial_file_name(identifier));
    if let Err(e) = write_entry(&mut entry, &partial) {
        let _ = fs::remove_file(&partial);
        return Err(io_err(&partial, e));
    }
    fs::rename(&partial, &target).map_err(|e| io_err(&target, e))?;

    Ok(target)
}

fn write_entry(entry: &mut impl Read, path: &Path) -> io::Result<()> {
    let mut file = File::create(path)?;
    io::copy(entry, &mut file)?;
    file.sync_all()
}

fn is_raster_entry(name: &str) -> bool {
    let is_file = !name.ends_with('/');
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ARTIFACT_EXTENSION))
        .unwrap_or(false);
    is_file && extension
}
