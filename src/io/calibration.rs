//! Intrinsic-calibration persistence.
//!
//! A calibration file is a small serialized record keyed by `K` (3×3
//! intrinsic matrix, row-major) and `D` (distortion coefficients), plus an
//! optional `model` naming the lens kind (defaults to `pinhole`). JSON and
//! YAML encodings are accepted, selected by extension.

use log::info;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::camera::{CameraModel, CameraModelError, LensModel, Resolution};
use crate::io::{extension_of, unsupported, IoError};

/// On-disk form of an intrinsic camera calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicCalibration {
    /// Intrinsic matrix, row-major.
    #[serde(rename = "K")]
    pub k: [[f64; 3]; 3],
    /// Distortion coefficients in the calibration's native order.
    #[serde(rename = "D")]
    pub d: Vec<f64>,
    /// Lens projection kind; absent means pinhole.
    #[serde(default)]
    pub model: LensModel,
}

impl IntrinsicCalibration {
    /// Converts the loaded record into a validated [`CameraModel`] for
    /// frames of the given size.
    pub fn into_camera(self, size: Resolution) -> Result<CameraModel, CameraModelError> {
        let k = Matrix3::from_fn(|r, c| self.k[r][c]);
        CameraModel::from_calibration(k, self.d, size, self.model)
    }
}

/// Loads a calibration record from a `.json`, `.yaml`, or `.yml` file.
///
/// # Errors
///
/// * [`IoError::UnsupportedFormat`] for any other extension.
/// * [`IoError::Io`] / [`IoError::Json`] / [`IoError::Yaml`] when the file
///   cannot be read or decoded.
pub fn load_calibration(path: &Path) -> Result<IntrinsicCalibration, IoError> {
    let decode: fn(&str) -> Result<IntrinsicCalibration, IoError> =
        match extension_of(path).as_deref() {
            Some("json") => |s| serde_json::from_str(s).map_err(IoError::from),
            Some("yaml") | Some("yml") => |s| serde_yaml::from_str(s).map_err(IoError::from),
            _ => return Err(unsupported(path)),
        };
    let contents = fs::read_to_string(path)?;
    let calibration = decode(&contents)?;
    info!("loaded calibration from {}", path.display());
    Ok(calibration)
}

/// Saves a calibration record next to the tracks it belongs to, using the
/// same extension dispatch as [`load_calibration`].
pub fn save_calibration(path: &Path, calibration: &IntrinsicCalibration) -> Result<(), IoError> {
    let contents = match extension_of(path).as_deref() {
        Some("json") => serde_json::to_string_pretty(calibration)?,
        Some("yaml") | Some("yml") => serde_yaml::to_string(calibration)?,
        _ => return Err(unsupported(path)),
    };
    fs::write(path, contents)?;
    Ok(())
}
