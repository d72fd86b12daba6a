use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Domain interface for face localisation.
///
/// Expects an RGB frame. Results are ordered by descending score, so the
/// first box is the most prominent face.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>>;
}
