//! CLI command implementations.
//!
//! Each submodule handles one CLI command:
//! - `run` - Download new editions and process every stage
//! - `plan` - Dry run of the download planning
//! - `status` - Per-chart processing state
//! - `invalidate` - Force charts to be rebuilt
//! - `config` - Configuration file management

pub mod config;
pub mod invalidate;
pub mod plan;
pub mod run;
pub mod status;
