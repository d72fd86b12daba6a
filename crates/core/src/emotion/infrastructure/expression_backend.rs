use crate::detection::domain::face_detector::FaceDetector;
use crate::emotion::domain::backend::{BackendError, EmotionBackend};
use crate::emotion::domain::detection_result::DetectionResult;
use crate::emotion::domain::face_expression::{
    dominant_expression, ExpressionClassifier, FaceExpression,
};
use crate::shared::frame::Frame;

/// `fer` backend: locate faces, score the expression of the first
/// (highest scoring) usable face and report its dominant label.
pub struct ExpressionBackend {
    detector: Box<dyn FaceDetector>,
    classifier: Box<dyn ExpressionClassifier>,
}

impl ExpressionBackend {
    pub fn new(detector: Box<dyn FaceDetector>, classifier: Box<dyn ExpressionClassifier>) -> Self {
        Self {
            detector,
            classifier,
        }
    }

    /// Only the first usable face is classified; the others never affect
    /// the result.
    fn first_expression(&mut self, rgb: &Frame) -> Result<Option<FaceExpression>, BackendError> {
        let faces = self
            .detector
            .detect(rgb)
            .map_err(|e| BackendError::Inference(e.to_string()))?;
        let Some(face) = faces.into_iter().find(|face| !face.is_degenerate()) else {
            return Ok(None);
        };
        let scores = self
            .classifier
            .classify(rgb, &face)
            .map_err(|e| BackendError::Inference(e.to_string()))?;
        Ok(Some(FaceExpression { face, scores }))
    }
}

impl EmotionBackend for ExpressionBackend {
    fn analyze(&mut self, frame: &Frame) -> Result<DetectionResult, BackendError> {
        if !frame.is_well_formed() {
            return Err(BackendError::InvalidFrame(format!(
                "{}x{}x{}",
                frame.width(),
                frame.height(),
                frame.channels()
            )));
        }
        let rgb = frame.to_rgb();
        let faces: Vec<FaceExpression> = self.first_expression(&rgb)?.into_iter().collect();
        if faces.is_empty() {
            log::trace!("Frame {}: no usable face", frame.index());
        }
        Ok(dominant_expression(&faces))
    }
}
