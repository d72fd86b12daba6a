//! Coarse emotion guess from mouth geometry.
//!
//! Not a classifier: a wide-open mouth reads as surprise, a wide mouth
//! relative to the face reads as a smile, anything else is neutral. The
//! thresholds are tunable constants, not fitted values.

use crate::detection::domain::face_mesh::FaceMesh;

use super::detection_result::DetectionResult;
use super::emotion_label::EmotionLabel;

/// Face-mesh indices used by the heuristic.
pub mod landmarks {
    pub const UPPER_LIP_INNER: usize = 13;
    pub const LOWER_LIP_INNER: usize = 14;
    pub const MOUTH_LEFT: usize = 61;
    pub const MOUTH_RIGHT: usize = 291;
    pub const FACE_LEFT: usize = 234;
    pub const FACE_RIGHT: usize = 454;
}

/// Guards divisions against zero-width measurements.
const EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometryThresholds {
    /// Opening/width ratio above which the mouth counts as open in surprise.
    pub surprise_ratio: f64,
    pub surprise_scale: f64,
    /// Mouth-width/face-width ratio above which the mouth counts as smiling.
    pub smile_ratio: f64,
    pub smile_scale: f64,
    pub happy_max_confidence: f64,
    pub neutral_confidence: f64,
    /// Horizontal offset (pixels) used when the right mouth corner is missing.
    pub missing_corner_offset: f64,
    /// Face width as a multiple of mouth width when reference points are missing.
    pub fallback_face_width_factor: f64,
}

impl Default for GeometryThresholds {
    fn default() -> Self {
        Self {
            surprise_ratio: 0.25,
            surprise_scale: 4.0,
            smile_ratio: 0.26,
            smile_scale: 5.0,
            happy_max_confidence: 0.95,
            neutral_confidence: 0.4,
            missing_corner_offset: 30.0,
            fallback_face_width_factor: 3.0,
        }
    }
}

/// Raw measurements the classification is based on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouthMetrics {
    pub opening: f64,
    pub width: f64,
    pub face_width: f64,
}

impl MouthMetrics {
    pub fn ratio(&self) -> f64 {
        self.opening / self.width
    }

    pub fn smile_score(&self) -> f64 {
        self.width / (self.face_width + EPSILON)
    }
}

#[derive(Clone, Debug, Default)]
pub struct GeometryHeuristic {
    thresholds: GeometryThresholds,
}

impl GeometryHeuristic {
    pub fn new(thresholds: GeometryThresholds) -> Self {
        Self { thresholds }
    }

    /// Measures the mouth, substituting approximations for a missing right
    /// corner or missing face-width references.
    ///
    /// Returns `None` when the lips or left corner are absent.
    pub fn measure(&self, mesh: &FaceMesh) -> Option<MouthMetrics> {
        let upper = mesh.point(landmarks::UPPER_LIP_INNER)?;
        let lower = mesh.point(landmarks::LOWER_LIP_INNER)?;
        let left = mesh.point(landmarks::MOUTH_LEFT)?;
        let right = mesh
            .point(landmarks::MOUTH_RIGHT)
            .unwrap_or((left.0 + self.thresholds.missing_corner_offset, left.1));

        let opening = distance(lower, upper);
        let width = distance(right, left) + EPSILON;
        let face_width = match (
            mesh.point(landmarks::FACE_LEFT),
            mesh.point(landmarks::FACE_RIGHT),
        ) {
            (Some(a), Some(b)) => distance(a, b),
            _ => width * self.thresholds.fallback_face_width_factor,
        };

        Some(MouthMetrics {
            opening,
            width,
            face_width,
        })
    }

    pub fn classify_metrics(&self, metrics: &MouthMetrics) -> DetectionResult {
        let t = &self.thresholds;
        let ratio = metrics.ratio();
        if ratio > t.surprise_ratio {
            let confidence = ((ratio - t.surprise_ratio) * t.surprise_scale).min(1.0);
            return DetectionResult::new(EmotionLabel::Surprise, confidence);
        }

        let smile = metrics.smile_score();
        if smile > t.smile_ratio {
            let confidence = ((smile - t.smile_ratio) * t.smile_scale).min(t.happy_max_confidence);
            return DetectionResult::new(EmotionLabel::Happy, confidence);
        }

        DetectionResult::new(EmotionLabel::Neutral, t.neutral_confidence)
    }

    /// Classifies a mesh; no mesh (no face) yields the unknown sentinel.
    pub fn classify(&self, mesh: Option<&FaceMesh>) -> DetectionResult {
        mesh.and_then(|m| self.measure(m))
            .map(|metrics| self.classify_metrics(&metrics))
            .unwrap_or_else(DetectionResult::unknown)
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}
