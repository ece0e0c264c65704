//! Brown–Conrady distortion removal for pinhole cameras.
//!
//! The forward model distorts normalized coordinates (x', y') = (x/z, y/z) as
//!
//! ```text
//! r² = x'² + y'²
//! d  = 1 + k₁·r² + k₂·r⁴ + k₃·r⁶
//! x_dist = d·x' + 2p₁·x'y' + p₂·(r² + 2x'²)
//! y_dist = d·y' + p₁·(r² + 2y'²) + 2p₂·x'y'
//! ```
//!
//! There is no closed-form inverse; [`undistort_point`] inverts it with the
//! fixed-point iteration used by OpenCV's `undistortPoints`, which converges
//! in a handful of rounds for the coefficient magnitudes real calibrations
//! produce.
//!
//! Output stays in normalized image coordinates: the solved (x, y) is NOT
//! reprojected through K. Downstream consumers that need pixel units rescale
//! with the camera's own intrinsics.

use nalgebra::Vector2;

use crate::camera::Intrinsics;

/// Fixed-point rounds for the inverse-distortion solve.
const UNDISTORT_ITERATIONS: usize = 5;

/// Removes radial and tangential distortion from one pixel coordinate.
///
/// `dist` carries `[k1, k2, p1, p2]` or `[k1, k2, p1, p2, k3]`.
///
/// The point is normalized by the intrinsics, the distortion is peeled off
/// iteratively, and the normalized result is returned as-is (unit focal
/// length, origin at the principal point).
pub(crate) fn undistort_point(
    intr: &Intrinsics,
    dist: &[f64],
    point: &Vector2<f64>,
) -> Vector2<f64> {
    let k1 = dist[0];
    let k2 = dist[1];
    let p1 = dist[2];
    let p2 = dist[3];
    let k3 = if dist.len() > 4 { dist[4] } else { 0.0 };

    let x0 = (point.x - intr.cx) / intr.fx;
    let y0 = (point.y - intr.cy) / intr.fy;

    // Fixed point of x = (x0 - tangential(x, y)) / radial(x, y).
    let mut x = x0;
    let mut y = y0;
    for _ in 0..UNDISTORT_ITERATIONS {
        let r2 = x * x + y * y;
        let icdist = 1.0 / (1.0 + ((k3 * r2 + k2) * r2 + k1) * r2);
        let delta_x = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
        let delta_y = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
        x = (x0 - delta_x) * icdist;
        y = (y0 - delta_y) * icdist;
    }

    Vector2::new(x, y)
}
