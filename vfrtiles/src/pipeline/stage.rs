//! Stage kinds, fan-out rules, and derived chart states.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A per-chart stage directory, in pipeline order.
///
/// The tile set is not a per-chart stage: it is built from the whole warped
/// set at once (see [`super::TileSet`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Extracted GeoTIFF as published.
    Raw,
    /// Paletted chart expanded to RGBA.
    ColorExpanded,
    /// Legend and border cut away along the chart's clipping shape.
    Cropped,
    /// Reprojected to the tile projection.
    Warped,
}

impl StageKind {
    /// All stages in pipeline order.
    pub const ALL: [StageKind; 4] = [
        StageKind::Raw,
        StageKind::ColorExpanded,
        StageKind::Cropped,
        StageKind::Warped,
    ];

    /// Directory name under the work directory.
    pub fn dir_name(self) -> &'static str {
        match self {
            StageKind::Raw => "01_raw",
            StageKind::ColorExpanded => "02_rgba",
            StageKind::Cropped => "03_cropped",
            StageKind::Warped => "04_warped",
        }
    }

    /// Human readable stage name.
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Raw => "raw",
            StageKind::ColorExpanded => "color-expanded",
            StageKind::Cropped => "cropped",
            StageKind::Warped => "warped",
        }
    }

    /// The stage whose outputs feed this one.
    pub fn previous(self) -> Option<StageKind> {
        match self {
            StageKind::Raw => None,
            StageKind::ColorExpanded => Some(StageKind::Raw),
            StageKind::Cropped => Some(StageKind::ColorExpanded),
            StageKind::Warped => Some(StageKind::Cropped),
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Processing state of one chart across the whole pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssetState {
    Missing,
    RawPresent,
    ColorExpanded,
    Cropped,
    Warped,
    Tiled,
}

impl AssetState {
    /// State reached once `stage` completed.
    pub fn after(stage: StageKind) -> Self {
        match stage {
            StageKind::Raw => AssetState::RawPresent,
            StageKind::ColorExpanded => AssetState::ColorExpanded,
            StageKind::Cropped => AssetState::Cropped,
            StageKind::Warped => AssetState::Warped,
        }
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetState::Missing => "missing",
            AssetState::RawPresent => "raw",
            AssetState::ColorExpanded => "color-expanded",
            AssetState::Cropped => "cropped",
            AssetState::Warped => "warped",
            AssetState::Tiled => "tiled",
        };
        f.write_str(s)
    }
}

/// Charts whose clipping splits them into several named parts.
///
/// From the splitting stage onwards such a chart is stored as one artifact
/// per part (e.g. the Western Aleutian Islands chart straddles the
/// antimeridian and is cut into an east and a west half). Every other chart
/// keeps a single artifact named after its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutRules {
    split_at: StageKind,
    rules: BTreeMap<String, Vec<String>>,
}

/// Chart split by default.
pub const WESTERN_ALEUTIAN_ISLANDS: &str = "Western_Aleutian_Islands";

impl Default for FanOutRules {
    fn default() -> Self {
        Self::empty().with_rule(
            WESTERN_ALEUTIAN_ISLANDS,
            [
                format!("{}_East", WESTERN_ALEUTIAN_ISLANDS),
                format!("{}_West", WESTERN_ALEUTIAN_ISLANDS),
            ],
        )
    }
}

impl FanOutRules {
    /// Rules that never split anything.
    pub fn empty() -> Self {
        Self {
            split_at: StageKind::Cropped,
            rules: BTreeMap::new(),
        }
    }

    /// Add (or replace) a split rule. Rules with no parts are ignored.
    pub fn with_rule<I, S>(mut self, identifier: impl Into<String>, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        if !parts.is_empty() {
            self.rules.insert(identifier.into(), parts);
        }
        self
    }

    /// The stage that performs the split.
    pub fn split_at(&self) -> StageKind {
        self.split_at
    }

    /// Part names of a split chart.
    pub fn parts(&self, identifier: &str) -> Option<&[String]> {
        self.rules.get(identifier).map(Vec::as_slice)
    }

    /// Iterate over all rules.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Chart identifier owning an artifact name.
    pub fn asset_of<'a>(&'a self, artifact: &'a str) -> &'a str {
        self.rules
            .iter()
            .find(|(_, parts)| parts.iter().any(|p| p == artifact))
            .map(|(identifier, _)| identifier.as_str())
            .unwrap_or(artifact)
    }

    /// Artifact names a chart has in `stage`.
    pub fn artifact_names(&self, identifier: &str, stage: StageKind) -> Vec<String> {
        match self.parts(identifier) {
            Some(parts) if stage >= self.split_at => parts.to_vec(),
            _ => vec![identifier.to_string()],
        }
    }

    /// Whether the chart is split when entering `stage`.
    pub fn splits(&self, identifier: &str, stage: StageKind) -> bool {
        stage == self.split_at && self.rules.contains_key(identifier)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
