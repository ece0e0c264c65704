//! Applies a camera model to every keypoint series of a track table.

use log::{debug, info};
use nalgebra::Vector2;
use rayon::prelude::*;

use crate::camera::CameraModel;
use crate::track::{
    KeypointSeries, SeriesColumn, TrackError, TrackTable, COLUMN_LIKELIHOOD, COLUMN_X, COLUMN_Y,
};

/// Runs one camera model over a whole track table.
///
/// Each keypoint's (x, y) series is undistorted as a batch while its
/// likelihood series (and any other column) is copied verbatim; the result is
/// a new table with the same scorer, frame index, keypoint set, and ordering
/// as the input. The input table is never mutated and no partial table is
/// ever returned.
///
/// Keypoint series are independent, so they are processed on a parallel
/// iterator: every worker reads the shared immutable model and produces an
/// owned output series, and the output table is assembled from the collected
/// results in input order.
pub struct TrackUndistorter {
    model: CameraModel,
}

impl TrackUndistorter {
    /// Wraps a fully configured camera model (crop offset, if any, already
    /// applied).
    pub fn new(model: CameraModel) -> Self {
        TrackUndistorter { model }
    }

    /// The wrapped camera model.
    pub fn model(&self) -> &CameraModel {
        &self.model
    }

    /// Undistorts every keypoint of `table` into a new table of identical
    /// shape.
    ///
    /// # Errors
    ///
    /// * [`TrackError::MissingColumns`] if any keypoint lacks an `x`, `y`, or
    ///   `likelihood` column.
    /// * [`TrackError::ShapeMismatch`] if a required column's length differs
    ///   from the table's frame count, or if the model returns a batch of the
    ///   wrong cardinality.
    pub fn run(&self, table: &TrackTable) -> Result<TrackTable, TrackError> {
        info!(
            "undistorting {} keypoints x {} frames",
            table.keypoints.len(),
            table.n_frames()
        );

        let keypoints = table
            .keypoints
            .par_iter()
            .map(|series| self.undistort_series(series, table.n_frames()))
            .collect::<Result<Vec<_>, TrackError>>()?;

        Ok(TrackTable {
            scorer: table.scorer.clone(),
            frames: table.frames.clone(),
            keypoints,
        })
    }

    fn undistort_series(
        &self,
        series: &KeypointSeries,
        n_frames: usize,
    ) -> Result<KeypointSeries, TrackError> {
        let x = require_column(series, COLUMN_X, n_frames)?;
        let y = require_column(series, COLUMN_Y, n_frames)?;
        require_column(series, COLUMN_LIKELIHOOD, n_frames)?;

        let points: Vec<Vector2<f64>> = x
            .iter()
            .zip(y.iter())
            .map(|(&px, &py)| Vector2::new(px, py))
            .collect();

        let undistorted = self.model.undistort(&points);
        if undistorted.len() != points.len() {
            return Err(TrackError::ShapeMismatch {
                keypoint: series.name.clone(),
                expected: points.len(),
                got: undistorted.len(),
            });
        }
        debug!("undistorted keypoint '{}'", series.name);

        // Rebuild the columns in source order; only x and y change.
        let columns = series
            .columns
            .iter()
            .map(|column| match column.label.as_str() {
                COLUMN_X => SeriesColumn {
                    label: column.label.clone(),
                    values: undistorted.iter().map(|p| p.x).collect(),
                },
                COLUMN_Y => SeriesColumn {
                    label: column.label.clone(),
                    values: undistorted.iter().map(|p| p.y).collect(),
                },
                _ => column.clone(),
            })
            .collect();

        Ok(KeypointSeries {
            name: series.name.clone(),
            columns,
        })
    }
}

/// Fetches a required column and checks it against the table's frame count.
fn require_column<'a>(
    series: &'a KeypointSeries,
    label: &str,
    n_frames: usize,
) -> Result<&'a [f64], TrackError> {
    let values = series
        .column(label)
        .ok_or_else(|| TrackError::MissingColumns {
            keypoint: series.name.clone(),
            column: label.to_string(),
        })?;
    if values.len() != n_frames {
        return Err(TrackError::ShapeMismatch {
            keypoint: series.name.clone(),
            expected: n_frames,
            got: values.len(),
        });
    }
    Ok(values)
}
