//! In-memory model of a pose-tracking keypoint table.
//!
//! The source format is a table with a three-level column header — scorer
//! identity, keypoint (body part) name, and field name (`x`, `y`,
//! `likelihood`) — over a shared frame index. [`TrackTable`] mirrors that
//! structure: an ordered list of [`KeypointSeries`], each holding its columns
//! under their original labels. Columns stay generic rather than being typed
//! into x/y/likelihood fields so that a malformed keypoint (say, one missing
//! its likelihood column) can be represented and rejected by the undistorter
//! instead of silently dropped at parse time.

use serde::{Deserialize, Serialize};

mod undistort;

pub use undistort::TrackUndistorter;

/// Column label of the horizontal pixel coordinate.
pub const COLUMN_X: &str = "x";
/// Column label of the vertical pixel coordinate.
pub const COLUMN_Y: &str = "y";
/// Column label of the tracking confidence score.
pub const COLUMN_LIKELIHOOD: &str = "likelihood";

/// Errors raised while transforming a track table.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// A keypoint does not carry one of the required x/y/likelihood columns.
    #[error("Keypoint '{keypoint}' is missing required column '{column}'")]
    MissingColumns { keypoint: String, column: String },
    /// A column's cardinality disagrees with the table's frame count, or the
    /// undistortion transform returned the wrong number of points. The
    /// latter is a programming error, not a data problem.
    #[error("Keypoint '{keypoint}': expected {expected} values, got {got}")]
    ShapeMismatch {
        keypoint: String,
        expected: usize,
        got: usize,
    },
}

/// One named column of per-frame values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesColumn {
    /// Field label, normally one of `x`, `y`, `likelihood`.
    pub label: String,
    /// One value per frame, in frame-index order.
    pub values: Vec<f64>,
}

/// All columns tracked for one named keypoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeypointSeries {
    /// Body-part name, e.g. `nose`.
    pub name: String,
    /// Columns in their source order.
    pub columns: Vec<SeriesColumn>,
}

impl KeypointSeries {
    /// Builds a series from the three standard columns in canonical order.
    pub fn from_parts(
        name: impl Into<String>,
        x: Vec<f64>,
        y: Vec<f64>,
        likelihood: Vec<f64>,
    ) -> Self {
        KeypointSeries {
            name: name.into(),
            columns: vec![
                SeriesColumn {
                    label: COLUMN_X.to_string(),
                    values: x,
                },
                SeriesColumn {
                    label: COLUMN_Y.to_string(),
                    values: y,
                },
                SeriesColumn {
                    label: COLUMN_LIKELIHOOD.to_string(),
                    values: likelihood,
                },
            ],
        }
    }

    /// Looks up a column's values by label.
    pub fn column(&self, label: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.values.as_slice())
    }
}

/// A full keypoint track table: scorer label, shared frame index, and the
/// keypoint series in their source enumeration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackTable {
    /// Annotator/scorer identity from the outer header level.
    pub scorer: String,
    /// Shared row index; strictly increasing frame numbers.
    pub frames: Vec<i64>,
    /// Keypoint series, preserving input ordering.
    pub keypoints: Vec<KeypointSeries>,
}

impl TrackTable {
    /// Number of frames (rows) in the table.
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Keypoint names in table order.
    pub fn keypoint_names(&self) -> Vec<&str> {
        self.keypoints.iter().map(|k| k.name.as_str()).collect()
    }
}
