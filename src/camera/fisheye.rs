//! Equidistant fisheye undistortion with new-camera-matrix estimation.
//!
//! The forward model maps the incidence angle θ of a ray to the image radius
//!
//! ```text
//! θ_d = θ·(1 + k₁θ² + k₂θ⁴ + k₃θ⁶ + k₄θ⁸)
//! ```
//!
//! (Kannala-Brandt polynomial, the fisheye convention of OpenCV-derived
//! calibrations). Undistorting a pixel therefore means recovering θ from the
//! observed θ_d, done here with a Newton iteration on the polynomial.
//!
//! Unlike the pinhole path, fisheye results are reprojected to pixel scale:
//! normalized undistorted coordinates are pushed through a new camera matrix
//! fitted by [`estimate_new_camera_matrix`] so the output lands in a frame of
//! the same size as the input.

use nalgebra::{Matrix3, Vector2};
use std::f64::consts::FRAC_PI_2;

use crate::camera::{Intrinsics, Resolution};

/// Newton iteration cap for the θ solve.
const MAX_NEWTON_ITERATIONS: usize = 10;
/// Convergence threshold on the θ update.
const NEWTON_EPS: f64 = 1e-8;

/// Focal fit weighting between minimal crop (0.0) and keeping every source
/// pixel in frame (1.0). The track pipeline always wants the former:
/// undistorted keypoints should use the full corrected field of view.
pub(crate) const NEW_MATRIX_BALANCE: f64 = 0.0;

/// Undistorts one pixel coordinate into normalized image coordinates.
///
/// Solves θ from the observed distorted radius with Newton's method, then
/// rescales the normalized point by tan(θ)/θ_d to undo the equidistant
/// mapping. θ_d is clamped at π/2 since the polynomial is only valid up to a
/// 180° field of view. If the iteration fails to converge the last estimate
/// is used.
fn undistort_normalized(intr: &Intrinsics, dist: &[f64], point: &Vector2<f64>) -> Vector2<f64> {
    let xd = (point.x - intr.cx) / intr.fx;
    let yd = (point.y - intr.cy) / intr.fy;

    let theta_d = (xd * xd + yd * yd).sqrt().min(FRAC_PI_2);
    if theta_d < NEWTON_EPS {
        return Vector2::new(xd, yd);
    }

    let mut theta = theta_d;
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let theta2 = theta * theta;
        let k1t2 = dist[0] * theta2;
        let k2t4 = dist[1] * theta2 * theta2;
        let k3t6 = dist[2] * theta2 * theta2 * theta2;
        let k4t8 = dist[3] * theta2 * theta2 * theta2 * theta2;
        let fix = (theta * (1.0 + k1t2 + k2t4 + k3t6 + k4t8) - theta_d)
            / (1.0 + 3.0 * k1t2 + 5.0 * k2t4 + 7.0 * k3t6 + 9.0 * k4t8);
        theta -= fix;
        if fix.abs() < NEWTON_EPS {
            break;
        }
    }

    let scale = theta.tan() / theta_d;
    Vector2::new(xd * scale, yd * scale)
}

/// Undistorts one pixel coordinate and reprojects it through `new_k`,
/// yielding pixel-scale output.
pub(crate) fn undistort_point(
    intr: &Intrinsics,
    dist: &[f64],
    new_k: &Matrix3<f64>,
    point: &Vector2<f64>,
) -> Vector2<f64> {
    let pu = undistort_normalized(intr, dist, point);
    Vector2::new(
        new_k[(0, 0)] * pu.x + new_k[(0, 2)],
        new_k[(1, 1)] * pu.y + new_k[(1, 2)],
    )
}

/// Fits a camera matrix for reprojecting undistorted points back to pixel
/// scale.
///
/// The midpoints of the four image edges are undistorted to normalized
/// coordinates; after normalizing out the fx/fy aspect ratio, candidate focal
/// lengths are fitted so that each half-extent of that quadrilateral spans
/// half the output frame. `balance` blends the smallest and largest
/// candidates: 0 keeps the whole undistorted quadrilateral in frame (maximal
/// undistortion, minimal crop), 1 favors retaining every source pixel.
///
/// # Arguments
///
/// * `intr` - Intrinsics of the calibrated (distorted) camera.
/// * `dist` - Fisheye coefficients k1..k4.
/// * `size` - Source frame resolution; the fitted matrix targets the same size.
/// * `balance` - Focal blend in \[0, 1\]; values outside are clamped.
pub(crate) fn estimate_new_camera_matrix(
    intr: &Intrinsics,
    dist: &[f64],
    size: &Resolution,
    balance: f64,
) -> Matrix3<f64> {
    let w = f64::from(size.width);
    let h = f64::from(size.height);
    let balance = balance.clamp(0.0, 1.0);

    // The edge midpoints bound the undistorted field of view.
    let rim = [
        Vector2::new(w / 2.0, 0.0),
        Vector2::new(w, h / 2.0),
        Vector2::new(w / 2.0, h),
        Vector2::new(0.0, h / 2.0),
    ];
    let undistorted: Vec<Vector2<f64>> = rim
        .iter()
        .map(|p| undistort_normalized(intr, dist, p))
        .collect();

    let mut center = undistorted
        .iter()
        .fold(Vector2::zeros(), |acc, p| acc + p)
        / undistorted.len() as f64;

    // Work in identity aspect ratio, restore fy and cy afterwards.
    let aspect = intr.fx / intr.fy;
    center.y *= aspect;

    let mut min_x = f64::MAX;
    let mut max_x = f64::MIN;
    let mut min_y = f64::MAX;
    let mut max_y = f64::MIN;
    for p in &undistorted {
        let y = p.y * aspect;
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    let f1 = w * 0.5 / (center.x - min_x);
    let f2 = w * 0.5 / (max_x - center.x);
    let f3 = h * 0.5 * aspect / (center.y - min_y);
    let f4 = h * 0.5 * aspect / (max_y - center.y);

    let f_min = f1.min(f2).min(f3.min(f4));
    let f_max = f1.max(f2).max(f3.max(f4));
    let f = balance * f_min + (1.0 - balance) * f_max;

    let cx_new = -center.x * f + w * 0.5;
    let cy_new = (-center.y * f + h * aspect * 0.5) / aspect;

    Matrix3::new(f, 0.0, cx_new, 0.0, f / aspect, cy_new, 0.0, 0.0, 1.0)
}
