use std::fmt;

use super::emotion_label::EmotionLabel;

/// Outcome of one detection call: a label and a confidence in `[0, 1]`.
///
/// The constructor enforces the confidence range, so every value of this
/// type is well-formed no matter which backend produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionResult {
    label: EmotionLabel,
    confidence: f64,
}

impl DetectionResult {
    /// Clamps `confidence` into `[0, 1]`; NaN becomes 0.
    pub fn new(label: EmotionLabel, confidence: f64) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self { label, confidence }
    }

    /// The `("unknown", 0.0)` sentinel.
    pub fn unknown() -> Self {
        Self {
            label: EmotionLabel::Unknown,
            confidence: 0.0,
        }
    }

    pub fn label(&self) -> EmotionLabel {
        self.label
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn is_unknown(&self) -> bool {
        self.label == EmotionLabel::Unknown
    }
}

impl Default for DetectionResult {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.2})", self.label, self.confidence)
    }
}
