//! vfrtiles - Incremental tiling of FAA VFR sectional charts
//!
//! This library keeps a local tile pyramid in sync with the sectional
//! charts published by the FAA. Each run lists the published chart
//! editions, downloads only new or missing ones, discards everything derived
//! from a replaced edition, and pushes every chart through the processing
//! stages (color expansion, cropping, reprojection) before rebuilding the
//! tiles. Runs resume where an interrupted run stopped.
//!
//! # Modules
//!
//! - [`state`]: version index and completion ledger
//! - [`catalog`]: listing of published charts
//! - [`planner`]: download planning
//! - [`fetch`]: chart download and extraction
//! - [`pipeline`]: processing stages, invalidation, and the tile set
//! - [`orchestrator`]: complete update runs
//! - [`config`]: `~/.vfrtiles/config.ini`
//! - [`logging`]: tracing setup

pub mod catalog;
pub mod config;
pub mod fetch;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod planner;
pub mod state;
