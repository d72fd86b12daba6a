use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::frame::Frame;

use super::detection_result::DetectionResult;

/// Interchangeable detection strategies, named by the capability they wrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// DeepFace-compatible analysis service.
    DeepFace,
    /// Face detector plus per-face expression classifier.
    Fer,
    /// Face-mesh landmarks fed to the geometry heuristic.
    MediaPipe,
    /// No capability: always the sentinel.
    None,
}

impl Backend {
    /// Probe order, most capable first.
    pub const PRIORITY: &'static [Backend] = &[
        Backend::DeepFace,
        Backend::Fer,
        Backend::MediaPipe,
        Backend::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::DeepFace => "deepface",
            Backend::Fer => "fer",
            Backend::MediaPipe => "mediapipe",
            Backend::None => "none",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown backend '{0}' (expected one of: deepface, fer, mediapipe, none)")]
pub struct ParseBackendError(pub String);

impl FromStr for Backend {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Backend::PRIORITY
            .iter()
            .copied()
            .find(|b| b.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseBackendError(s.to_string()))
    }
}

/// Why a backend could not produce a result for a frame.
///
/// Never reaches callers of the detector: the session converts every
/// variant into the unknown sentinel.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("{0} backend is not configured")]
    NotConfigured(Backend),
    #[error("model {0} not found")]
    ModelMissing(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("analysis request failed: {0}")]
    Request(String),
    #[error("frame encoding failed: {0}")]
    Encode(String),
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

/// One detection strategy, constructed once and reused across frames.
///
/// Implementations may hold model sessions or HTTP clients, hence `&mut self`.
pub trait EmotionBackend: Send {
    fn analyze(&mut self, frame: &Frame) -> Result<DetectionResult, BackendError>;
}

/// Knows which backends the environment supports and how to build them.
pub trait BackendFactory: Send {
    /// Cheap availability check: locate the capability, do not load it.
    fn is_available(&self, backend: Backend) -> bool;

    /// Construct the handle for `backend`. Called at most once per backend
    /// per session, on first use.
    fn create(&self, backend: Backend) -> Result<Box<dyn EmotionBackend>, BackendError>;
}

/// First backend in [`Backend::PRIORITY`] the factory reports as available.
pub fn probe(factory: &dyn BackendFactory) -> Backend {
    let selected = Backend::PRIORITY
        .iter()
        .copied()
        .find(|b| factory.is_available(*b))
        .unwrap_or(Backend::None);
    log::info!("Emotion backend probe selected: {selected}");
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("deepface", Backend::DeepFace)]
    #[case("fer", Backend::Fer)]
    #[case("MediaPipe", Backend::MediaPipe)]
    #[case(" none ", Backend::None)]
    fn test_parse(#[case] input: &str, #[case] expected: Backend) {
        assert_eq!(input.parse::<Backend>().unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "opencv".parse::<Backend>().unwrap_err();
        assert_eq!(err, ParseBackendError("opencv".to_string()));
        assert!("auto".parse::<Backend>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_ids() {
        assert_eq!(serde_json::to_string(&Backend::MediaPipe).unwrap(), "\"mediapipe\"");
        let b: Backend = serde_json::from_str("\"deepface\"").unwrap();
        assert_eq!(b, Backend::DeepFace);
    }

    struct Availability(Vec<Backend>);

    impl BackendFactory for Availability {
        fn is_available(&self, backend: Backend) -> bool {
            self.0.contains(&backend)
        }

        fn create(&self, backend: Backend) -> Result<Box<dyn EmotionBackend>, BackendError> {
            Err(BackendError::NotConfigured(backend))
        }
    }

    #[rstest]
    #[case(vec![Backend::DeepFace, Backend::Fer, Backend::MediaPipe], Backend::DeepFace)]
    #[case(vec![Backend::Fer, Backend::MediaPipe], Backend::Fer)]
    #[case(vec![Backend::MediaPipe], Backend::MediaPipe)]
    #[case(vec![], Backend::None)]
    fn test_probe_follows_priority(#[case] available: Vec<Backend>, #[case] expected: Backend) {
        assert_eq!(probe(&Availability(available)), expected);
    }

    #[test]
    fn test_probe_is_deterministic() {
        let factory = Availability(vec![Backend::Fer]);
        assert_eq!(probe(&factory), probe(&factory));
    }
}
