//! Per-chart processing stages and the final tile set.
//!
//! Charts flow forward through numbered stage directories under the work
//! directory:
//!
//! ```text
//! 01_raw ─► 02_rgba ─► 03_cropped ─► 04_warped ─► tiles/<z>/<x>/<y>.png
//!           expand     cutline       reproject    vrt + gdal_tiler
//! ```
//!
//! # Completion
//!
//! A file existing in a stage directory is not enough to call a stage
//! done. The [`StagePipeline`] records `(chart, stage, version)` in the
//! [`CompletionLedger`](crate::state::CompletionLedger) only after every
//! output of that chart was published, and publishes each output by
//! renaming a hidden partial file. Outputs left behind by a killed run, or
//! produced from an older version, are recomputed.
//!
//! # Invalidation
//!
//! The only backward signal is the [`InvalidationCascade`], run before a
//! new version of a chart is downloaded. It removes the chart's artifacts
//! from every stage and forgets its completions.
//!
//! # Fan-out
//!
//! [`FanOutRules`] name the charts that are split into several parts by
//! the crop stage. Later stages operate on the parts one to one, and a
//! split chart is complete only when all of its parts are.

mod error;
mod gdal;
mod invalidate;
mod layout;
mod runner;
mod stage;
mod tileset;
mod transform;

pub use error::{PipelineError, PipelineResult};
pub use gdal::{ColorExpand, CutlineCrop, GdalTiler, Reproject};
pub use invalidate::InvalidationCascade;
pub use layout::{download_file_name, partial_file_name, WorkspaceLayout, ARTIFACT_EXTENSION};
pub use runner::{StageFailure, StagePipeline, StageReport};
pub use stage::{AssetState, FanOutRules, StageKind, WESTERN_ALEUTIAN_ISLANDS};
pub use tileset::{TileSet, TileSetBuilder, TileSetOutcome};
pub use transform::{Transform, TransformError, TransformJob};
