//! Chart download and extraction into the raw stage.

mod error;
mod extract;
mod http;

pub use error::{FetchError, FetchResult};
pub use extract::extract_raster;
pub use http::HttpFetcher;

use std::path::{Path, PathBuf};

use crate::planner::DownloadTask;

/// Downloads one chart version into the raw stage directory.
pub trait AssetFetcher {
    /// Fetch `task` and publish `<raw_dir>/<identifier>.tif`.
    ///
    /// On success the raw artifact is complete; on failure nothing is left
    /// under the artifact's name.
    fn fetch(&self, task: &DownloadTask, raw_dir: &Path) -> FetchResult<PathBuf>;
}

impl<T: AssetFetcher + ?Sized> AssetFetcher for Box<T> {
    fn fetch(&self, task: &DownloadTask, raw_dir: &Path) -> FetchResult<PathBuf> {
        (**self).fetch(task, raw_dir)
    }
}
