//! File-format boundary of the pipeline.
//!
//! Everything here runs before or after the core transform: loading the
//! intrinsic calibration, reading and writing the keypoint track table, and
//! probing a reference frame for its pixel dimensions. Formats are selected
//! by file extension; anything unrecognized fails with
//! [`IoError::UnsupportedFormat`] instead of being guessed at.

use std::path::Path;

pub mod calibration;
pub mod frame;
pub mod table;

/// Errors raised at the file-format boundary.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// The file extension does not name a supported format.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    /// The file exists but its contents do not parse as the expected table
    /// structure.
    #[error("Malformed track table: {0}")]
    MalformedTable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Lower-cased extension of `path`, if any.
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Builds the `UnsupportedFormat` error for `path`.
pub(crate) fn unsupported(path: &Path) -> IoError {
    IoError::UnsupportedFormat(path.display().to_string())
}
