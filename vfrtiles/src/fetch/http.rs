//! HTTP chart downloader.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use super::error::{FetchError, FetchResult};
use super::extract::extract_raster;
use super::AssetFetcher;
use crate::config::DEFAULT_DOWNLOAD_TIMEOUT_SECS;
use crate::pipeline::download_file_name;
use crate::planner::DownloadTask;

/// Downloads chart archives with a blocking HTTP client.
///
/// The archive is streamed to `.<chart>.download.zip` next to the raw
/// artifacts and removed once the GeoTIFF has been extracted, whether or
/// not that succeeded. An archive left by a killed run is overwritten by
/// the next download of the same chart.
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> FetchResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS))
    }

    /// Create a fetcher with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Stream `url` into `dest`.
    fn download(&self, url: &str, dest: &mut fs::File, dest_path: &Path) -> FetchResult<u64> {
        let download_err = |reason: String| FetchError::Download {
            url: url.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| download_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut writer = BufWriter::new(dest);
        let bytes = response
            .copy_to(&mut writer)
            .map_err(|e| download_err(e.to_string()))?;
        writer.flush().map_err(|e| FetchError::Io {
            path: dest_path.to_path_buf(),
            source: e,
        })?;

        Ok(bytes)
    }
}

impl AssetFetcher for HttpFetcher {
    fn fetch(&self, task: &DownloadTask, raw_dir: &Path) -> FetchResult<PathBuf> {
        fs::create_dir_all(raw_dir).map_err(|e| FetchError::Io {
            path: raw_dir.to_path_buf(),
            source: e,
        })?;

        let archive_path = raw_dir.join(download_file_name(&task.identifier));
        let mut archive = fs::File::create(&archive_path).map_err(|e| FetchError::Io {
            path: archive_path.clone(),
            source: e,
        })?;

        info!(chart = %task.identifier, version = task.version, url = %task.url, "Downloading chart");
        let result = self
            .download(&task.url, &mut archive, &archive_path)
            .and_then(|bytes| {
                debug!(chart = %task.identifier, bytes, "Archive downloaded");
                extract_raster(&archive_path, raw_dir, &task.identifier)
            });

        drop(archive);
        if let Err(e) = fs::remove_file(&archive_path) {
            warn!(path = %archive_path.display(), error = %e, "Failed to remove chart archive");
        }

        result
    }
}
