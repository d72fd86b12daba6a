use std::path::Path;

use crate::capture::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;

/// Writes a single frame to an image file using the `image` crate.
///
/// The format follows the file extension. BGR frames are converted first,
/// so snapshots look the way the camera saw them.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if !frame.is_well_formed() {
            return Err("cannot write an empty or non-RGB frame".into());
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let rgb = frame.to_rgb();
        let img = image::RgbImage::from_raw(rgb.width(), rgb.height(), rgb.data().to_vec())
            .ok_or("Failed to create image from frame data")?;

        img.save(path)?;
        log::debug!("Wrote frame {} to {}", frame.index(), path.display());
        Ok(())
    }
}
