use std::path::Path;

use crate::shared::frame::Frame;

/// Persists a displayed frame (debug frame, live snapshot) at its
/// captured size.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
