//! Download planning.
//!
//! Compares the catalog against the version store and the raw stage and
//! decides which charts must be (re)downloaded. Planning has no side
//! effects, so it also backs the `plan` command.

use std::collections::HashMap;
use std::fmt;

use crate::catalog::CatalogEntry;
use crate::state::{Version, VersionStore};

/// A chart version to download in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub identifier: String,
    pub url: String,
    pub version: Version,
}

impl From<&CatalogEntry> for DownloadTask {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            identifier: entry.identifier.clone(),
            url: entry.url.clone(),
            version: entry.version,
        }
    }
}

impl fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (version {})", self.identifier, self.version)
    }
}

/// Result of planning a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Downloads, one per chart, in first-seen order.
    pub tasks: Vec<DownloadTask>,
    /// Charts listed by the catalog that need nothing.
    pub up_to_date: Vec<String>,
}

impl Plan {
    /// Whether nothing needs downloading.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task planned for a chart, if any.
    pub fn task(&self, identifier: &str) -> Option<&DownloadTask> {
        self.tasks.iter().find(|t| t.identifier == identifier)
    }
}

/// Decide which catalog entries need downloading.
///
/// An entry is a candidate when its raw artifact is missing or the catalog
/// version is newer than the recorded one. Candidates are merged per chart:
/// a later candidate with a higher version upgrades the queued task, any
/// other repeat is dropped. The result holds at most one task per chart,
/// carrying the highest version seen.
///
/// `raw_present` reports whether the raw artifact of a chart exists.
pub fn plan_updates<F>(
    entries: &[CatalogEntry],
    versions: &dyn VersionStore,
    raw_present: F,
) -> Plan
where
    F: Fn(&str) -> bool,
{
    let mut plan = Plan::default();
    let mut queued: HashMap<&str, usize> = HashMap::new();

    for entry in entries {
        let id = entry.identifier.as_str();
        let newer = versions
            .get(id)
            .map_or(true, |recorded| recorded < entry.version);
        if newer || !raw_present(id) {
            match queued.get(id) {
                Some(&i) => {
                    let task = &mut plan.tasks[i];
                    if entry.version > task.version {
                        task.url = entry.url.clone();
                        task.version = entry.version;
                    }
                }
                None => {
                    queued.insert(id, plan.tasks.len());
                    plan.tasks.push(DownloadTask::from(entry));
                }
            }
        }
    }

    for entry in entries {
        let id = entry.identifier.as_str();
        if !queued.contains_key(id) && !plan.up_to_date.iter().any(|u| u == id) {
            plan.up_to_date.push(id.to_string());
        }
    }

    plan
}
