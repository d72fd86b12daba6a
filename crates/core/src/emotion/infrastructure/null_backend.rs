use crate::emotion::domain::backend::{BackendError, EmotionBackend};
use crate::emotion::domain::detection_result::DetectionResult;
use crate::shared::frame::Frame;

/// Backend used when no capability is available: always the sentinel.
pub struct NullEmotionBackend;

impl EmotionBackend for NullEmotionBackend {
    fn analyze(&mut self, _frame: &Frame) -> Result<DetectionResult, BackendError> {
        Ok(DetectionResult::unknown())
    }
}
