use std::collections::BTreeMap;

use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

use super::detection_result::DetectionResult;
use super::emotion_label::EmotionLabel;

/// Per-face expression scores, each already in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceExpression {
    pub face: FaceBox,
    pub scores: BTreeMap<EmotionLabel, f64>,
}

impl FaceExpression {
    /// Label with the highest score, if any score is present.
    pub fn dominant(&self) -> Option<(EmotionLabel, f64)> {
        self.scores
            .iter()
            .filter(|(_, score)| !score.is_nan())
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(label, score)| (*label, *score))
    }
}

/// Scores the expression of a single face inside an RGB frame.
pub trait ExpressionClassifier: Send {
    fn classify(
        &mut self,
        frame: &Frame,
        face: &FaceBox,
    ) -> Result<BTreeMap<EmotionLabel, f64>, Box<dyn std::error::Error>>;
}

/// Reduces per-face results to one detection: the first face's dominant
/// label and its score. No faces, or a face without scores, is unknown.
pub fn dominant_expression(faces: &[FaceExpression]) -> DetectionResult {
    faces
        .first()
        .and_then(FaceExpression::dominant)
        .map(|(label, score)| DetectionResult::new(label, score))
        .unwrap_or_else(DetectionResult::unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn face(scores: &[(EmotionLabel, f64)]) -> FaceExpression {
        FaceExpression {
            face: FaceBox::new(0.0, 0.0, 10.0, 10.0, 0.9),
            scores: scores.iter().copied().collect(),
        }
    }

    #[test]
    fn test_picks_max_score_of_first_face() {
        let faces = vec![
            face(&[
                (EmotionLabel::Happy, 0.1),
                (EmotionLabel::Sad, 0.7),
                (EmotionLabel::Neutral, 0.2),
            ]),
            face(&[(EmotionLabel::Angry, 0.99)]),
        ];
        let r = dominant_expression(&faces);
        assert_eq!(r.label(), EmotionLabel::Sad);
        assert_relative_eq!(r.confidence(), 0.7);
    }

    #[test]
    fn test_no_faces_is_unknown() {
        assert_eq!(dominant_expression(&[]), DetectionResult::unknown());
    }

    #[test]
    fn test_empty_scores_is_unknown() {
        assert_eq!(dominant_expression(&[face(&[])]), DetectionResult::unknown());
    }

    #[test]
    fn test_nan_scores_are_ignored() {
        let faces = vec![face(&[
            (EmotionLabel::Fear, f64::NAN),
            (EmotionLabel::Disgust, 0.3),
        ])];
        let r = dominant_expression(&faces);
        assert_eq!(r.label(), EmotionLabel::Disgust);
    }
}
