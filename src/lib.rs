//! Lens-distortion correction for 2-D pose-tracking keypoint tables.
//!
//! A pose-estimation network reports keypoints in the pixel grid of the raw
//! camera, lens distortion included. Before those tracks can feed
//! triangulation or measurement they need the distortion removed. This crate
//! does exactly that step:
//!
//! - [`camera::CameraModel`] holds one camera's intrinsic calibration
//!   (K, D, frame size, lens kind) and undistorts batches of pixel
//!   coordinates, for both standard pinhole and wide-angle fisheye lenses;
//! - [`track::TrackTable`] models the three-level keypoint table (scorer /
//!   body part / x-y-likelihood) and [`track::TrackUndistorter`] rewrites
//!   every keypoint's coordinates while passing confidence scores through
//!   untouched;
//! - [`io`] loads calibration records, reads and writes the table files, and
//!   probes a reference frame for its dimensions.
//!
//! The per-lens output conventions intentionally differ: pinhole results stay
//! in normalized image coordinates while fisheye results are pixel-scale; see
//! [`camera::CameraModel::undistort`].

pub mod camera;
pub mod io;
pub mod track;

// Re-export commonly used types
pub use camera::{CameraModel, CameraModelError, LensModel, Resolution};
pub use track::{KeypointSeries, SeriesColumn, TrackError, TrackTable, TrackUndistorter};
