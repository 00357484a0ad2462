//! Persistent pipeline state.
//!
//! Two small JSON documents live in the work directory:
//!
//! - `version_index.json` ([`JsonVersionStore`]): the last ingested version
//!   of every chart, the single source of truth for "is this chart current".
//! - `completion_ledger.json` ([`CompletionLedger`]): which stages finished
//!   for which chart version, plus the fingerprint of the last tile build.
//!
//! Both are replaced atomically on every write so a killed process leaves
//! either the old or the new document behind, never a torn one.

mod error;
mod json_file;
mod ledger;
mod version_store;

pub use error::{StoreError, StoreResult};
pub use ledger::{CompletionLedger, CompletionRecord, TileSetFingerprint};
pub use version_store::{
    JsonVersionStore, MemoryVersionStore, Version, VersionRecord, VersionStore,
};
