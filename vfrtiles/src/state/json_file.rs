//! Atomic JSON document persistence shared by the state files.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use super::error::{StoreError, StoreResult};

/// Load a document, returning the default value when the file does not exist.
pub(super) fn load<T>(path: &Path) -> StoreResult<T>
where
    T: DeserializeOwned + Default,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => {
            return Err(StoreError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Replace a document atomically.
///
/// The new content is written to a temp file next to `path`, flushed to disk,
/// then renamed over the old file.
pub(super) fn save<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    fs::create_dir_all(dir).map_err(|e| StoreError::WriteFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let write_failed = |source: io::Error| StoreError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n").map_err(write_failed)?;
    tmp.as_file().sync_all().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;

    Ok(())
}
