//! Integration tests pinning the numerical contracts of the undistortion
//! transform.

use approx::assert_relative_eq;
use nalgebra::{Matrix3, Vector2};
use track_undistort::{CameraModel, LensModel, Resolution};

fn vga() -> Resolution {
    Resolution {
        width: 640,
        height: 480,
    }
}

fn pinhole_k() -> Matrix3<f64> {
    Matrix3::new(1000.0, 0.0, 320.0, 0.0, 1000.0, 240.0, 0.0, 0.0, 1.0)
}

/// Pinhole output is normalized, not pixel-scale: with zero distortion the
/// center maps to the origin and a 100 px offset maps to 0.1 normalized
/// units.
#[test]
fn test_pinhole_zero_distortion_fixture() {
    let model =
        CameraModel::from_calibration(pinhole_k(), vec![0.0; 4], vga(), LensModel::Pinhole)
            .unwrap();

    let raw = vec![
        Vector2::new(320.0, 240.0),
        Vector2::new(420.0, 240.0),
        Vector2::new(320.0, 340.0),
    ];
    let out = model.undistort(&raw);

    assert_eq!(out.len(), 3);
    assert_relative_eq!(out[0].x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(out[0].y, 0.0, epsilon = 1e-12);
    assert_relative_eq!(out[1].x, 0.1, epsilon = 1e-12);
    assert_relative_eq!(out[1].y, 0.0, epsilon = 1e-12);
    assert_relative_eq!(out[2].x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(out[2].y, 0.1, epsilon = 1e-12);
}

/// Reprojecting zero-distortion pinhole output through K reproduces the raw
/// pixels, i.e. the transform is the identity up to normalization.
#[test]
fn test_pinhole_zero_distortion_reprojects_to_input() {
    let model =
        CameraModel::from_calibration(pinhole_k(), vec![0.0; 5], vga(), LensModel::Pinhole)
            .unwrap();

    let raw = vec![
        Vector2::new(12.5, 470.0),
        Vector2::new(320.0, 240.0),
        Vector2::new(601.0, 33.0),
    ];
    for (input, normalized) in raw.iter().zip(model.undistort(&raw)) {
        let k = model.k();
        assert_relative_eq!(k[(0, 0)] * normalized.x + k[(0, 2)], input.x, epsilon = 1e-9);
        assert_relative_eq!(k[(1, 1)] * normalized.y + k[(1, 2)], input.y, epsilon = 1e-9);
    }
}

/// With real distortion coefficients the correction moves off-center points
/// but still fixes the principal point.
#[test]
fn test_pinhole_distortion_fixes_center_only() {
    let model = CameraModel::from_calibration(
        pinhole_k(),
        vec![-0.28, 0.07, 0.0002, 0.00002, 0.0],
        vga(),
        LensModel::Pinhole,
    )
    .unwrap();

    let out = model.undistort(&[Vector2::new(320.0, 240.0), Vector2::new(500.0, 100.0)]);
    assert_relative_eq!(out[0].x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(out[0].y, 0.0, epsilon = 1e-12);

    // The off-center point must differ from its plain normalization.
    let plain = Vector2::new((500.0 - 320.0) / 1000.0, (100.0 - 240.0) / 1000.0);
    assert!((out[1] - plain).norm() > 1e-6);
}

/// Fisheye output is pixel-scale: with a symmetric camera the corrected
/// center lands back on the frame center, and symmetric inputs stay
/// symmetric.
#[test]
fn test_fisheye_pixel_scale_symmetry() {
    let k = Matrix3::new(460.0, 0.0, 320.0, 0.0, 460.0, 240.0, 0.0, 0.0, 1.0);
    let model = CameraModel::from_calibration(
        k,
        vec![-0.01, 0.05, -0.08, 0.04],
        vga(),
        LensModel::Fisheye,
    )
    .unwrap();

    let out = model.undistort(&[
        Vector2::new(320.0, 240.0),
        Vector2::new(420.0, 240.0),
        Vector2::new(220.0, 240.0),
    ]);

    assert_relative_eq!(out[0].x, 320.0, epsilon = 1e-9);
    assert_relative_eq!(out[0].y, 240.0, epsilon = 1e-9);
    // Mirror-image inputs around the center map to mirror-image outputs.
    assert_relative_eq!(out[1].x - 320.0, 320.0 - out[2].x, epsilon = 1e-9);
    assert_relative_eq!(out[1].y, 240.0, epsilon = 1e-9);
    assert_relative_eq!(out[2].y, 240.0, epsilon = 1e-9);
}

/// Both lens kinds tolerate empty and single-point batches.
#[test]
fn test_degenerate_batches() {
    for (lens, d) in [
        (LensModel::Pinhole, vec![-0.1, 0.01, 0.0, 0.0]),
        (LensModel::Fisheye, vec![0.02, -0.004, 0.001, 0.0]),
    ] {
        let model = CameraModel::from_calibration(pinhole_k(), d, vga(), lens).unwrap();
        assert!(model.undistort(&[]).is_empty());
        assert_eq!(model.undistort(&[Vector2::new(100.0, 100.0)]).len(), 1);
    }
}

/// The crop-offset adjustment shifts where the principal point sits in the
/// cropped frame, so a point at the shifted center normalizes to the origin.
#[test]
fn test_crop_offset_recenters_principal_point() {
    let model =
        CameraModel::from_calibration(pinhole_k(), vec![0.0; 4], vga(), LensModel::Pinhole)
            .unwrap();
    let cropped = model.with_crop_offset(100, 60);

    assert_relative_eq!(cropped.k()[(0, 2)], 220.0);
    assert_relative_eq!(cropped.k()[(1, 2)], 180.0);

    let out = cropped.undistort(&[Vector2::new(220.0, 180.0)]);
    assert_relative_eq!(out[0].x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(out[0].y, 0.0, epsilon = 1e-12);

    // The source model keeps its own principal point.
    let out = model.undistort(&[Vector2::new(320.0, 240.0)]);
    assert_relative_eq!(out[0].x, 0.0, epsilon = 1e-12);
}
