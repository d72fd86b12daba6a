use crate::detection::domain::face_mesh::FaceMeshEstimator;
use crate::emotion::domain::backend::{BackendError, EmotionBackend};
use crate::emotion::domain::detection_result::DetectionResult;
use crate::emotion::domain::geometry_heuristic::GeometryHeuristic;
use crate::shared::frame::Frame;

/// `mediapipe` backend: face-mesh landmarks classified by mouth geometry.
pub struct FaceMeshBackend {
    estimator: Box<dyn FaceMeshEstimator>,
    heuristic: GeometryHeuristic,
}

impl FaceMeshBackend {
    pub fn new(estimator: Box<dyn FaceMeshEstimator>, heuristic: GeometryHeuristic) -> Self {
        Self {
            estimator,
            heuristic,
        }
    }
}

impl EmotionBackend for FaceMeshBackend {
    fn analyze(&mut self, frame: &Frame) -> Result<DetectionResult, BackendError> {
        if !frame.is_well_formed() {
            return Err(BackendError::InvalidFrame(format!(
                "{}x{}x{}",
                frame.width(),
                frame.height(),
                frame.channels()
            )));
        }
        let mesh = self
            .estimator
            .estimate(&frame.to_rgb())
            .map_err(|e| BackendError::Inference(e.to_string()))?;
        Ok(self.heuristic.classify(mesh.as_ref()))
    }
}
