use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::emotion::domain::emotion_label::EmotionLabel;

/// Cross-cutting logger for session events.
///
/// Decouples the frame loop from output mechanisms so callers can observe
/// a session without changing the orchestration code.
pub trait SessionLogger: Send {
    /// A frame was fully processed.
    fn frame(&mut self, index: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record the label reported for one frame.
    fn emotion(&mut self, label: EmotionLabel);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullSessionLogger;

impl SessionLogger for NullSessionLogger {
    fn frame(&mut self, _index: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn emotion(&mut self, _label: EmotionLabel) {}
    fn info(&mut self, _message: &str) {}
}

/// Running totals for one stage; constant size however long the session runs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTiming {
    pub total_ms: f64,
    pub count: usize,
}

impl StageTiming {
    pub fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }
}

/// CLI-oriented logger that tracks per-stage timing and label counts, and
/// provides a summary report when the session ends.
///
/// Progress output is throttled to every `throttle_frames` frames.
pub struct StdoutSessionLogger {
    throttle_frames: usize,
    timings: HashMap<String, StageTiming>,
    labels: BTreeMap<EmotionLabel, usize>,
    start_time: Instant,
    frames: usize,
}

impl StdoutSessionLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            labels: BTreeMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no frame was processed.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames;
        let mut lines = Vec::new();

        lines.push(format!(
            "Session summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let timing = self.timings[stage];
            lines.push(format!(
                "  {stage:12}: avg {:6.1}ms  total {:7.0}ms",
                timing.avg_ms(),
                timing.total_ms
            ));
        }

        for (label, count) in &self.labels {
            let pct = *count as f64 / frames as f64 * 100.0;
            lines.push(format!("  {label:12}: {count} frames ({pct:4.1}%)"));
        }

        if elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<StageTiming> {
        self.timings.get(stage).copied()
    }

    pub fn label_count(&self, label: EmotionLabel) -> usize {
        self.labels.get(&label).copied().unwrap_or(0)
    }
}

impl Default for StdoutSessionLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl SessionLogger for StdoutSessionLogger {
    fn frame(&mut self, index: usize) {
        self.frames += 1;
        if self.frames % self.throttle_frames == 0 {
            log::info!("Processed {} frames (last index {index})", self.frames);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        let timing = self.timings.entry(stage.to_string()).or_default();
        timing.total_ms += duration_ms;
        timing.count += 1;
    }

    fn emotion(&mut self, label: EmotionLabel) {
        *self.labels.entry(label).or_default() += 1;
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullSessionLogger;
        logger.frame(0);
        logger.timing("detect", 5.0);
        logger.emotion(EmotionLabel::Happy);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StdoutSessionLogger::new(10);
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("capture", 5.0);

        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count, 2);
        assert_eq!(detect.total_ms, 50.0);
        assert_eq!(detect.avg_ms(), 25.0);
        assert_eq!(logger.timings_for("capture").unwrap().count, 1);
        assert!(logger.timings_for("encode").is_none());
    }

    #[test]
    fn test_long_session_keeps_running_totals() {
        let mut logger = StdoutSessionLogger::new(10);
        for _ in 0..100_000 {
            logger.timing("detect", 2.0);
        }
        let detect = logger.timings_for("detect").unwrap();
        assert_eq!(detect.count, 100_000);
        assert_eq!(detect.total_ms, 200_000.0);
        assert_eq!(detect.avg_ms(), 2.0);
    }

    #[test]
    fn test_empty_stage_timing_average_is_zero() {
        assert_eq!(StageTiming::default().avg_ms(), 0.0);
    }

    #[test]
    fn test_label_counts() {
        let mut logger = StdoutSessionLogger::new(10);
        logger.emotion(EmotionLabel::Happy);
        logger.emotion(EmotionLabel::Happy);
        logger.emotion(EmotionLabel::Unknown);
        assert_eq!(logger.label_count(EmotionLabel::Happy), 2);
        assert_eq!(logger.label_count(EmotionLabel::Unknown), 1);
        assert_eq!(logger.label_count(EmotionLabel::Sad), 0);
    }

    #[test]
    fn test_summary_includes_stages_labels_and_fps() {
        let mut logger = StdoutSessionLogger::new(10);
        for i in 0..4 {
            logger.frame(i);
            logger.timing("detect", 10.0);
            logger.emotion(if i < 3 {
                EmotionLabel::Neutral
            } else {
                EmotionLabel::Surprise
            });
        }

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Session summary (4 frames"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("neutral"));
        assert!(summary.contains("3 frames (75.0%)"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = StdoutSessionLogger::new(10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_default_throttle() {
        let logger = StdoutSessionLogger::default();
        assert_eq!(logger.throttle_frames, 30);
    }
}
