//! FAA digital products page for VFR sectional charts.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use tracing::{debug, info};

use super::error::{CatalogError, CatalogResult};
use super::{CatalogEntry, RemoteCatalog};
use crate::config::DEFAULT_DOWNLOAD_TIMEOUT_SECS;

/// Listing page of the current sectional chart editions.
pub const DEFAULT_CATALOG_URL: &str =
    "https://www.faa.gov/air_traffic/flight_info/aeronav/digital_products/vfr/";

/// Links to chart archives: `.../sectional_files/<Name>_<Version>.zip`.
fn sectional_link_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r#"="?(https?://aeronav\.faa\.gov/content/aeronav/sectional_files/([a-zA-Z_\-]+)_([0-9]+)\.zip)"?>"#,
        )
        .unwrap()
    })
}

/// Extract every chart archive link from a listing page.
///
/// Entries are returned in page order. Duplicates and several editions of
/// the same chart are kept as they appear. Links whose version does not fit
/// in a `u64` are ignored.
pub fn parse_listing(html: &str) -> Vec<CatalogEntry> {
    sectional_link_regex()
        .captures_iter(html)
        .filter_map(|caps| {
            let version = caps[3].parse().ok()?;
            Some(CatalogEntry::new(&caps[2], &caps[1], version))
        })
        .collect()
}

/// Catalog backed by the FAA sectional chart listing page.
#[derive(Debug)]
pub struct FaaSectionalCatalog {
    client: Client,
    url: String,
}

impl FaaSectionalCatalog {
    /// Create a catalog reading the default FAA page.
    pub fn new() -> CatalogResult<Self> {
        Self::with_url(
            DEFAULT_CATALOG_URL,
            Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        )
    }

    /// Create a catalog reading `url` with a request timeout.
    pub fn with_url(url: impl Into<String>, timeout: Duration) -> CatalogResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Listing page URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RemoteCatalog for FaaSectionalCatalog {
    fn list_available(&self) -> CatalogResult<Vec<CatalogEntry>> {
        debug!(url = %self.url, "Fetching chart listing");
        let fetch_err = |e: reqwest::Error| CatalogError::Fetch {
            url: self.url.clone(),
            reason: e.to_string(),
        };

        let response = self.client.get(&self.url).send().map_err(fetch_err)?;
        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().map_err(fetch_err)?;
        let entries = parse_listing(&body);
        info!(charts = entries.len(), "Chart listing fetched");
        Ok(entries)
    }
}
