//! Calibrated-camera model and the batch point-undistortion transform.
//!
//! A [`CameraModel`] bundles the intrinsic matrix K, the distortion
//! coefficient vector D, the image resolution, and the lens projection kind.
//! Once constructed it is read-only: the only way to obtain a model with a
//! different principal point is [`CameraModel::with_crop_offset`], which
//! returns a new value.
//!
//! The actual distortion-removal math lives in the per-lens submodules:
//! - [`pinhole`]: Brown–Conrady radial/tangential removal,
//! - [`fisheye`]: equidistant (Kannala-Brandt style) removal with an
//!   estimated new camera matrix.

use log::info;
use nalgebra::{Matrix3, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod fisheye;
pub mod pinhole;

/// Lens projection kind of a calibrated camera.
///
/// A closed set: every calibration file the loader accepts names one of these
/// two, and [`CameraModel::undistort`] dispatches on the variant in exactly
/// one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensModel {
    /// Standard perspective projection with radial/tangential distortion
    /// (4 or 5 coefficients: k1, k2, p1, p2, and optionally k3).
    Pinhole,
    /// Wide-angle equidistant projection with 4 coefficients (k1..k4).
    Fisheye,
}

impl Default for LensModel {
    /// Calibration files that do not name a model are treated as pinhole.
    fn default() -> Self {
        LensModel::Pinhole
    }
}

/// Image resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// The width of the image in pixels.
    pub width: u32,
    /// The height of the image in pixels.
    pub height: u32,
}

/// Focal lengths and principal point extracted from the intrinsic matrix.
///
/// The undistortion routines work on these four scalars rather than the full
/// matrix; skew is not modelled.
#[derive(Debug, Clone, Copy)]
pub struct Intrinsics {
    /// The focal length along the x-axis, in pixels.
    pub fx: f64,
    /// The focal length along the y-axis, in pixels.
    pub fy: f64,
    /// The x-coordinate of the principal point, in pixels.
    pub cx: f64,
    /// The y-coordinate of the principal point, in pixels.
    pub cy: f64,
}

/// Errors raised while constructing a [`CameraModel`].
#[derive(thiserror::Error, Debug)]
pub enum CameraModelError {
    /// A focal length entry of K is zero or negative.
    #[error("Focal length must be positive")]
    FocalLengthMustBePositive,
    /// A principal-point entry of K is not a finite number.
    #[error("Principal point must be finite")]
    PrincipalPointMustBeFinite,
    /// The calibration is structurally wrong for the chosen lens model:
    /// non-finite entries, an unsupported distortion-coefficient count, or a
    /// zero-area resolution.
    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),
}

/// A calibrated camera, ready to undistort pixel coordinates.
///
/// Constructed once per run from a loaded calibration (and, for cropped
/// footage, a crop offset), then shared read-only across every keypoint
/// series.
#[derive(Clone, PartialEq)]
pub struct CameraModel {
    k: Matrix3<f64>,
    dist: Vec<f64>,
    size: Resolution,
    model: LensModel,
}

impl fmt::Debug for CameraModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let intr = self.intrinsics();
        write!(
            f,
            "{:?} [fx: {} fy: {} cx: {} cy: {} D: {:?} size: {}x{}]",
            self.model,
            intr.fx,
            intr.fy,
            intr.cx,
            intr.cy,
            self.dist,
            self.size.width,
            self.size.height
        )
    }
}

impl CameraModel {
    /// Builds a model from a loaded intrinsic calibration.
    ///
    /// Pure construction, no I/O. The coefficient count must match the lens
    /// model: 4 or 5 (k1, k2, p1, p2, \[k3\]) for [`LensModel::Pinhole`],
    /// exactly 4 (k1..k4) for [`LensModel::Fisheye`].
    ///
    /// # Arguments
    ///
    /// * `k` - 3×3 intrinsic matrix.
    /// * `dist` - Distortion coefficients in the calibration's native order.
    /// * `size` - Resolution of the frames the tracks were produced from.
    /// * `model` - Lens projection kind.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::FocalLengthMustBePositive`] if `k[(0,0)]` or
    ///   `k[(1,1)]` is not strictly positive.
    /// * [`CameraModelError::PrincipalPointMustBeFinite`] if `k[(0,2)]` or
    ///   `k[(1,2)]` is NaN or infinite.
    /// * [`CameraModelError::InvalidCalibration`] for non-finite K or D
    ///   entries, a coefficient count the model does not support, or a
    ///   zero-area `size`.
    pub fn from_calibration(
        k: Matrix3<f64>,
        dist: Vec<f64>,
        size: Resolution,
        model: LensModel,
    ) -> Result<Self, CameraModelError> {
        if k.iter().any(|v| !v.is_finite()) {
            return Err(CameraModelError::InvalidCalibration(
                "intrinsic matrix contains non-finite entries".to_string(),
            ));
        }
        if k[(0, 0)] <= 0.0 || k[(1, 1)] <= 0.0 {
            return Err(CameraModelError::FocalLengthMustBePositive);
        }
        if !k[(0, 2)].is_finite() || !k[(1, 2)].is_finite() {
            return Err(CameraModelError::PrincipalPointMustBeFinite);
        }
        if dist.iter().any(|v| !v.is_finite()) {
            return Err(CameraModelError::InvalidCalibration(
                "distortion coefficients contain non-finite entries".to_string(),
            ));
        }
        let accepted = match model {
            LensModel::Pinhole => dist.len() == 4 || dist.len() == 5,
            LensModel::Fisheye => dist.len() == 4,
        };
        if !accepted {
            return Err(CameraModelError::InvalidCalibration(format!(
                "{model:?} model does not support {} distortion coefficients",
                dist.len()
            )));
        }
        if size.width == 0 || size.height == 0 {
            return Err(CameraModelError::InvalidCalibration(format!(
                "resolution must be positive, got {}x{}",
                size.width, size.height
            )));
        }

        let camera = CameraModel {
            k,
            dist,
            size,
            model,
        };
        info!("constructed camera model: {camera:?}");
        Ok(camera)
    }

    /// Returns a copy of the model with the principal point translated into a
    /// crop's coordinate frame.
    ///
    /// `K'[(0,2)] = K[(0,2)] - offset_col` and `K'[(1,2)] = K[(1,2)] - offset_row`;
    /// every other field, including D and the resolution, is unchanged, and
    /// the receiver is not modified.
    ///
    /// Apply at most once, before any [`undistort`](Self::undistort) call:
    /// repeated application shifts the principal point again.
    pub fn with_crop_offset(&self, offset_col: u32, offset_row: u32) -> CameraModel {
        let mut k = self.k;
        k[(0, 2)] -= f64::from(offset_col);
        k[(1, 2)] -= f64::from(offset_row);
        CameraModel { k, ..self.clone() }
    }

    /// Removes lens distortion from a batch of raw pixel coordinates.
    ///
    /// The output has the same length and ordering as the input (including
    /// empty and single-point batches) and the model is not mutated.
    ///
    /// The two lens kinds produce output at different scales, matching the
    /// OpenCV conventions the calibration files come from:
    ///
    /// * **Pinhole** results stay in normalized image coordinates (unit focal
    ///   length, origin at the principal point) — the behavior of
    ///   `undistortPoints` when no new projection matrix is supplied.
    /// * **Fisheye** results are reprojected through a camera matrix freshly
    ///   fitted for minimal crop, so they land back in pixel units.
    pub fn undistort(&self, points: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
        let intr = self.intrinsics();
        match self.model {
            LensModel::Pinhole => points
                .iter()
                .map(|p| pinhole::undistort_point(&intr, &self.dist, p))
                .collect(),
            LensModel::Fisheye => {
                let new_k = fisheye::estimate_new_camera_matrix(
                    &intr,
                    &self.dist,
                    &self.size,
                    fisheye::NEW_MATRIX_BALANCE,
                );
                points
                    .iter()
                    .map(|p| fisheye::undistort_point(&intr, &self.dist, &new_k, p))
                    .collect()
            }
        }
    }

    /// The intrinsic matrix K.
    pub fn k(&self) -> &Matrix3<f64> {
        &self.k
    }

    /// The distortion coefficients in the calibration's native order.
    pub fn distortion(&self) -> &[f64] {
        &self.dist
    }

    /// The frame resolution the model was built for.
    pub fn resolution(&self) -> Resolution {
        self.size
    }

    /// The lens projection kind.
    pub fn lens(&self) -> LensModel {
        self.model
    }

    /// Focal lengths and principal point read out of K.
    pub fn intrinsics(&self) -> Intrinsics {
        Intrinsics {
            fx: self.k[(0, 0)],
            fy: self.k[(1, 1)],
            cx: self.k[(0, 2)],
            cy: self.k[(1, 2)],
        }
    }
}
