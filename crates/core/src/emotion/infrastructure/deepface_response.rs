//! Response shapes of DeepFace-compatible `/analyze` endpoints.
//!
//! Depending on the server version the body is a bare record, a list of
//! records (one per face), or `{"results": [...]}`. Every envelope is an
//! explicit variant; field spellings are separate optional fields.

use std::collections::HashMap;

use serde::Deserialize;

use crate::emotion::domain::detection_result::DetectionResult;
use crate::emotion::domain::emotion_label::EmotionLabel;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    Wrapped { results: AnalyzeRecords },
    Bare(AnalyzeRecords),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AnalyzeRecords {
    Many(Vec<AnalyzeRecord>),
    One(AnalyzeRecord),
}

/// One analysed face. Servers disagree on field names and some send
/// several spellings at once, possibly null or empty, so each spelling is
/// its own field and [`AnalyzeRecord::label_name`] picks the first usable one.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRecord {
    #[serde(default)]
    pub dominant_emotion: Option<String>,
    #[serde(default)]
    pub dominant_emotions: Option<String>,
    #[serde(default)]
    pub dominant: Option<String>,
    #[serde(default)]
    pub emotion: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub emotions: Option<HashMap<String, f64>>,
}

impl AnalyzeResponse {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// First record, whatever the envelope.
    pub fn first_record(&self) -> Option<&AnalyzeRecord> {
        let records = match self {
            AnalyzeResponse::Wrapped { results } => results,
            AnalyzeResponse::Bare(records) => records,
        };
        match records {
            AnalyzeRecords::Many(list) => list.first(),
            AnalyzeRecords::One(record) => Some(record),
        }
    }

    pub fn normalize(&self) -> DetectionResult {
        self.first_record()
            .map(AnalyzeRecord::normalize)
            .unwrap_or_else(DetectionResult::unknown)
    }
}

impl AnalyzeRecord {
    /// First non-empty label spelling: `dominant_emotion`, `dominant_emotions`, `dominant`.
    pub fn label_name(&self) -> Option<&str> {
        [&self.dominant_emotion, &self.dominant_emotions, &self.dominant]
            .into_iter()
            .filter_map(|name| name.as_deref())
            .find(|name| !name.trim().is_empty())
    }

    /// First non-empty score map: `emotion`, then `emotions`.
    pub fn scores(&self) -> Option<&HashMap<String, f64>> {
        self.emotion
            .as_ref()
            .filter(|scores| !scores.is_empty())
            .or_else(|| self.emotions.as_ref().filter(|scores| !scores.is_empty()))
    }

    /// Dominant label with its score from the score map.
    ///
    /// Unknown when the label is missing or outside the closed set, or
    /// when the map has no score for it.
    pub fn normalize(&self) -> DetectionResult {
        let Some(name) = self.label_name() else {
            return DetectionResult::unknown();
        };
        let label = match EmotionLabel::from_name(name) {
            Some(EmotionLabel::Unknown) | None => return DetectionResult::unknown(),
            Some(label) => label,
        };
        let score = self.scores().and_then(|scores| {
            scores
                .get(name)
                .or_else(|| scores.get(label.as_str()))
                .copied()
        });
        match score {
            Some(raw) => DetectionResult::new(label, normalize_score(raw)),
            None => DetectionResult::unknown(),
        }
    }
}

/// Scores above 1 are read as percentages.
///
/// Unverified against every server version: a genuine fractional score
/// can never exceed 1, so the rule is safe in that direction only.
pub fn normalize_score(raw: f64) -> f64 {
    if raw > 1.0 {
        raw / 100.0
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn normalize(body: &str) -> DetectionResult {
        AnalyzeResponse::parse(body).unwrap().normalize()
    }

    #[test]
    fn test_percentage_score_is_scaled() {
        let r = normalize(r#"{"dominant_emotion": "happy", "emotion": {"happy": 80.0, "sad": 5.0}}"#);
        assert_eq!(r.label(), EmotionLabel::Happy);
        assert_relative_eq!(r.confidence(), 0.8);
    }

    #[test]
    fn test_fractional_score_kept() {
        let r = normalize(r#"{"dominant_emotion": "sad", "emotion": {"sad": 0.93}}"#);
        assert_eq!(r.label(), EmotionLabel::Sad);
        assert_relative_eq!(r.confidence(), 0.93);
    }

    #[rstest]
    #[case::list(r#"[{"dominant_emotion": "angry", "emotion": {"angry": 55}}, {"dominant_emotion": "happy", "emotion": {"happy": 99}}]"#)]
    #[case::wrapped(r#"{"results": [{"dominant_emotion": "angry", "emotion": {"angry": 55}}]}"#)]
    #[case::wrapped_single(r#"{"results": {"dominant_emotion": "angry", "emotion": {"angry": 55}}}"#)]
    #[case::alias_dominant(r#"{"dominant": "angry", "emotions": {"angry": 55}}"#)]
    #[case::alias_plural(r#"{"dominant_emotions": "angry", "emotion": {"angry": 55}}"#)]
    #[case::duplicate_spellings(r#"{"dominant_emotion": "angry", "dominant": "angry", "emotion": {"angry": 55}}"#)]
    #[case::null_label_spelling(r#"{"dominant_emotion": null, "dominant": "angry", "emotion": {"angry": 55}}"#)]
    #[case::empty_scores_spelling(r#"{"dominant_emotion": "angry", "emotion": {}, "emotions": {"angry": 55}}"#)]
    #[case::empty_label_spelling(r#"{"dominant_emotion": "", "dominant_emotions": "angry", "emotions": {"angry": 55}}"#)]
    #[case::extra_fields(r#"{"age": 31, "region": {"x": 1}, "dominant_emotion": "angry", "emotion": {"angry": 55}}"#)]
    fn test_shapes_normalize_to_first_record(#[case] body: &str) {
        let r = normalize(body);
        assert_eq!(r.label(), EmotionLabel::Angry);
        assert_relative_eq!(r.confidence(), 0.55);
    }

    #[rstest]
    #[case::empty_list("[]")]
    #[case::empty_results(r#"{"results": []}"#)]
    #[case::no_label(r#"{"emotion": {"happy": 80}}"#)]
    #[case::no_scores(r#"{"dominant_emotion": "happy"}"#)]
    #[case::label_not_in_scores(r#"{"dominant_emotion": "happy", "emotion": {"sad": 80}}"#)]
    #[case::label_outside_set(r#"{"dominant_emotion": "contempt", "emotion": {"contempt": 80}}"#)]
    #[case::error_body(r#"{"error": "Face could not be detected"}"#)]
    fn test_incomplete_responses_are_unknown(#[case] body: &str) {
        assert_eq!(normalize(body), DetectionResult::unknown());
    }

    #[test]
    fn test_first_label_spelling_wins() {
        let r = normalize(
            r#"{"dominant_emotion": "sad", "dominant": "happy", "emotion": {"sad": 60, "happy": 30}}"#,
        );
        assert_eq!(r.label(), EmotionLabel::Sad);
        assert_relative_eq!(r.confidence(), 0.6);
    }

    #[test]
    fn test_score_above_hundred_is_clamped() {
        let r = normalize(r#"{"dominant_emotion": "fear", "emotion": {"fear": 250}}"#);
        assert_eq!(r.label(), EmotionLabel::Fear);
        assert_eq!(r.confidence(), 1.0);
    }

    #[test]
    fn test_label_case_differs_from_score_key() {
        let r = normalize(r#"{"dominant_emotion": "Happy", "emotion": {"happy": 40}}"#);
        assert_eq!(r.label(), EmotionLabel::Happy);
        assert_relative_eq!(r.confidence(), 0.4);
    }

    #[test]
    fn test_non_json_fails_to_parse() {
        assert!(AnalyzeResponse::parse("<html>502</html>").is_err());
        assert!(AnalyzeResponse::parse("\"oops\"").is_err());
    }

    #[rstest]
    #[case(80.0, 0.8)]
    #[case(1.0, 1.0)]
    #[case(0.5, 0.5)]
    #[case(100.0, 1.0)]
    fn test_normalize_score(#[case] raw: f64, #[case] expected: f64) {
        assert_relative_eq!(normalize_score(raw), expected);
    }
}
