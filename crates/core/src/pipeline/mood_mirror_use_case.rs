use std::path::Path;
use std::time::Instant;

use crate::capture::domain::camera::{Camera, CaptureError};
use crate::capture::domain::image_writer::ImageWriter;
use crate::emotion::domain::backend::Backend;
use crate::emotion::domain::detection_result::DetectionResult;
use crate::emotion::domain::emotion_detector::EmotionDetector;
use crate::history::mood_history::{HistoryError, MoodHistory};
use crate::pipeline::session_logger::SessionLogger;
use crate::shared::frame::Frame;

/// What one step of the live loop produced.
#[derive(Clone, Debug)]
pub struct FrameReport {
    /// The frame as displayed: mirrored, in capture colour order.
    pub frame: Frame,
    pub result: DetectionResult,
    pub backend: Backend,
}

/// Live mood-mirror session: capture → mirror → detect → record.
///
/// Camera failures are returned to the caller and leave the detector and
/// history untouched; detection itself never fails.
pub struct MoodMirrorUseCase {
    camera: Box<dyn Camera>,
    detector: EmotionDetector,
    history: MoodHistory,
    image_writer: Box<dyn ImageWriter>,
    logger: Box<dyn SessionLogger>,
    last_frame: Option<Frame>,
}

impl MoodMirrorUseCase {
    pub fn new(
        camera: Box<dyn Camera>,
        detector: EmotionDetector,
        history: MoodHistory,
        image_writer: Box<dyn ImageWriter>,
        logger: Box<dyn SessionLogger>,
    ) -> Self {
        Self {
            camera,
            detector,
            history,
            image_writer,
            logger,
            last_frame: None,
        }
    }

    pub fn start(&mut self) -> Result<(), CaptureError> {
        self.camera.start()?;
        self.logger.info(&format!(
            "Started {} with {} backend",
            self.camera.describe(),
            self.detector.backend()
        ));
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.camera.is_running() {
            self.camera.stop();
            self.logger.info("Camera stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.camera.is_running()
    }

    /// Process one frame.
    pub fn step(&mut self) -> Result<FrameReport, CaptureError> {
        let t0 = Instant::now();
        let raw = self.camera.read()?;
        let frame = raw.mirrored();
        let t1 = Instant::now();
        let result = self.detector.get_emotion(&frame);
        let t2 = Instant::now();

        self.history.record(result);
        self.logger
            .timing("capture", t1.duration_since(t0).as_secs_f64() * 1000.0);
        self.logger
            .timing("detect", t2.duration_since(t1).as_secs_f64() * 1000.0);
        self.logger.emotion(result.label());
        self.logger.frame(frame.index());

        self.last_frame = Some(frame.clone());
        Ok(FrameReport {
            frame,
            result,
            backend: self.detector.backend(),
        })
    }

    pub fn detector(&self) -> &EmotionDetector {
        &self.detector
    }

    /// Backend switches take effect on the next [`MoodMirrorUseCase::step`].
    pub fn detector_mut(&mut self) -> &mut EmotionDetector {
        &mut self.detector
    }

    pub fn history(&self) -> &MoodHistory {
        &self.history
    }

    pub fn save_history(&mut self, path: &Path) -> Result<usize, HistoryError> {
        let rows = self.history.save_csv(path)?;
        if rows == 0 {
            self.logger.info("No history to save yet");
        } else {
            self.logger
                .info(&format!("Saved {rows} rows to {}", path.display()));
        }
        Ok(rows)
    }

    /// Write the most recently displayed frame. Returns `false` when no
    /// frame has been captured yet.
    pub fn snapshot(&mut self, path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
        let Some(frame) = &self.last_frame else {
            return Ok(false);
        };
        self.image_writer.write(path, frame)?;
        self.logger
            .info(&format!("Saved snapshot to {}", path.display()));
        Ok(true)
    }

    /// Stop the camera and emit the session summary.
    pub fn finish(&mut self) {
        self.stop();
        self.logger.summary();
    }
}
