//! Frame-dimension probe.
//!
//! The fisheye path needs the pixel size of the frames the tracks were
//! produced from. Rather than pulling in a video-decoding stack for two
//! integers, the pipeline takes one representative frame exported as an
//! image and reads only its header.

use log::info;
use std::path::Path;

use crate::camera::Resolution;
use crate::io::IoError;

/// Reads the pixel dimensions of a reference frame image.
///
/// Only the image header is parsed; pixel data is never decoded.
pub fn reference_frame_size(path: &Path) -> Result<Resolution, IoError> {
    let (width, height) = image::image_dimensions(path)?;
    info!("reference frame {} is {width}x{height}", path.display());
    Ok(Resolution { width, height })
}
