//! FER+ expression classifier (ONNX model zoo `emotion-ferplus-8`).
//!
//! Input: 1x1x64x64 grayscale, raw 0..=255 intensities.
//! Output: 8 logits in the order of [`FERPLUS_CLASSES`].

use std::collections::BTreeMap;
use std::path::Path;

use crate::detection::infrastructure::execution_provider::load_session;
use crate::detection::infrastructure::math::softmax;
use crate::detection::infrastructure::tensor::{crop_resize_gray, crop_window};
use crate::emotion::domain::emotion_label::EmotionLabel;
use crate::emotion::domain::face_expression::ExpressionClassifier;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

const INPUT_SIZE: usize = 64;

/// Model class order. `None` marks classes outside the label set (contempt).
pub const FERPLUS_CLASSES: [Option<EmotionLabel>; 8] = [
    Some(EmotionLabel::Neutral),
    Some(EmotionLabel::Happy),
    Some(EmotionLabel::Surprise),
    Some(EmotionLabel::Sad),
    Some(EmotionLabel::Angry),
    Some(EmotionLabel::Disgust),
    Some(EmotionLabel::Fear),
    None,
];

pub struct OnnxFerPlusClassifier {
    session: ort::session::Session,
}

impl OnnxFerPlusClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: load_session(model_path)?,
        })
    }
}

impl ExpressionClassifier for OnnxFerPlusClassifier {
    fn classify(
        &mut self,
        frame: &Frame,
        face: &FaceBox,
    ) -> Result<BTreeMap<EmotionLabel, f64>, Box<dyn std::error::Error>> {
        let window = crop_window(frame, face).ok_or("face box lies outside the frame")?;
        let input = crop_resize_gray(frame, window, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        let logits = outputs[0].try_extract_array::<f32>()?;
        let logits = logits.as_slice().ok_or("Cannot get logit slice")?;
        if logits.len() != FERPLUS_CLASSES.len() {
            return Err(format!(
                "FER+ model expected {} logits, got {}",
                FERPLUS_CLASSES.len(),
                logits.len()
            )
            .into());
        }
        Ok(scores_from_logits(logits))
    }
}

/// Softmax over all classes, then drop classes without a label.
///
/// Probabilities are not renormalized after dropping, so a face that
/// looks mostly contemptuous keeps a low dominant score.
fn scores_from_logits(logits: &[f32]) -> BTreeMap<EmotionLabel, f64> {
    softmax(logits)
        .into_iter()
        .zip(FERPLUS_CLASSES)
        .filter_map(|(p, class)| class.map(|label| (label, p as f64)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scores_follow_class_order() {
        let mut logits = [0.0f32; 8];
        logits[2] = 10.0; // surprise
        let scores = scores_from_logits(&logits);
        let (best, p) = scores
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        assert_eq!(*best, EmotionLabel::Surprise);
        assert!(*p > 0.99);
    }

    #[test]
    fn test_contempt_is_dropped() {
        let scores = scores_from_logits(&[0.0; 8]);
        assert_eq!(scores.len(), 7);
        assert!(!scores.contains_key(&EmotionLabel::Unknown));
        for p in scores.values() {
            assert_relative_eq!(*p, 0.125, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_every_label_but_unknown_is_covered() {
        let covered: Vec<EmotionLabel> = FERPLUS_CLASSES.iter().flatten().copied().collect();
        for &label in EmotionLabel::ALL {
            if label != EmotionLabel::Unknown {
                assert!(covered.contains(&label), "{label} missing");
            }
        }
    }
}
