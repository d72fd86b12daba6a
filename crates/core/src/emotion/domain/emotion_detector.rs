use std::collections::{HashMap, HashSet};

use crate::shared::frame::Frame;

use super::backend::{probe, Backend, BackendFactory, EmotionBackend};
use super::detection_result::DetectionResult;

/// Detection session: the active backend selection plus the backend
/// handles built for it.
///
/// Handles are created on the first frame that needs them and reused
/// afterwards. Detection is best-effort: [`EmotionDetector::get_emotion`]
/// always returns a well-formed result, falling back to the unknown
/// sentinel on any failure.
pub struct EmotionDetector {
    factory: Box<dyn BackendFactory>,
    backend: Backend,
    handles: HashMap<Backend, Box<dyn EmotionBackend>>,
    /// Backends whose construction failed; not retried this session.
    failed: HashSet<Backend>,
}

impl EmotionDetector {
    /// Probes the factory once and selects the most capable available backend.
    pub fn new(factory: Box<dyn BackendFactory>) -> Self {
        let backend = probe(factory.as_ref());
        Self::with_backend(factory, backend)
    }

    /// Uses `backend` without probing.
    pub fn with_backend(factory: Box<dyn BackendFactory>, backend: Backend) -> Self {
        Self {
            factory,
            backend,
            handles: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    /// `Some` forces a backend, `None` means probe.
    pub fn from_preference(factory: Box<dyn BackendFactory>, preference: Option<Backend>) -> Self {
        match preference {
            Some(backend) => {
                log::info!("Emotion backend forced by configuration: {backend}");
                Self::with_backend(factory, backend)
            }
            None => Self::new(factory),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Switch backends; only subsequent calls are affected.
    pub fn set_backend(&mut self, backend: Backend) {
        if backend != self.backend {
            log::info!("Emotion backend changed: {} -> {backend}", self.backend);
            self.backend = backend;
        }
    }

    /// Re-run the probe and select its result.
    pub fn reprobe(&mut self) -> Backend {
        let backend = probe(self.factory.as_ref());
        self.set_backend(backend);
        backend
    }

    /// Availability of every backend according to the factory, in priority order.
    pub fn availability(&self) -> Vec<(Backend, bool)> {
        Backend::PRIORITY
            .iter()
            .map(|b| (*b, self.factory.is_available(*b)))
            .collect()
    }

    /// Label and confidence for one frame. Never fails.
    pub fn get_emotion(&mut self, frame: &Frame) -> DetectionResult {
        if !frame.is_well_formed() {
            log::debug!(
                "Skipping malformed frame {} ({}x{}x{}, {} bytes)",
                frame.index(),
                frame.width(),
                frame.height(),
                frame.channels(),
                frame.data().len()
            );
            return DetectionResult::unknown();
        }

        let backend = self.backend;
        let Some(handle) = self.handle(backend) else {
            return DetectionResult::unknown();
        };

        match handle.analyze(frame) {
            // Rebuild through the constructor so the range invariant holds
            // even for a misbehaving backend.
            Ok(result) => DetectionResult::new(result.label(), result.confidence()),
            Err(e) => {
                log::debug!("{backend} backend failed on frame {}: {e}", frame.index());
                DetectionResult::unknown()
            }
        }
    }

    fn handle(&mut self, backend: Backend) -> Option<&mut Box<dyn EmotionBackend>> {
        if self.failed.contains(&backend) {
            return None;
        }
        if !self.handles.contains_key(&backend) {
            match self.factory.create(backend) {
                Ok(handle) => {
                    log::info!("Initialized {backend} emotion backend");
                    self.handles.insert(backend, handle);
                }
                Err(e) => {
                    log::warn!("Could not initialize {backend} emotion backend: {e}");
                    self.failed.insert(backend);
                    return None;
                }
            }
        }
        self.handles.get_mut(&backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::domain::backend::BackendError;
    use crate::emotion::domain::emotion_label::EmotionLabel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scripted backend behaviour for the fake factory.
    #[derive(Clone, Copy)]
    enum Script {
        Returns(EmotionLabel, f64),
        Fails,
    }

    struct ScriptedBackend(Script);

    impl EmotionBackend for ScriptedBackend {
        fn analyze(&mut self, _frame: &Frame) -> Result<DetectionResult, BackendError> {
            match self.0 {
                Script::Returns(label, confidence) => Ok(DetectionResult::new(label, confidence)),
                Script::Fails => Err(BackendError::Inference("boom".into())),
            }
        }
    }

    struct FakeFactory {
        available: Vec<Backend>,
        scripts: HashMap<Backend, Script>,
        unbuildable: Vec<Backend>,
        created: Arc<AtomicUsize>,
    }

    impl FakeFactory {
        fn new(available: &[Backend]) -> Self {
            Self {
                available: available.to_vec(),
                scripts: HashMap::new(),
                unbuildable: Vec::new(),
                created: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn script(mut self, backend: Backend, script: Script) -> Self {
            self.scripts.insert(backend, script);
            self
        }
    }

    impl BackendFactory for FakeFactory {
        fn is_available(&self, backend: Backend) -> bool {
            self.available.contains(&backend)
        }

        fn create(&self, backend: Backend) -> Result<Box<dyn EmotionBackend>, BackendError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            if self.unbuildable.contains(&backend) {
                return Err(BackendError::ModelMissing("fake.onnx".into()));
            }
            let script = self
                .scripts
                .get(&backend)
                .copied()
                .unwrap_or(Script::Returns(EmotionLabel::Unknown, 0.0));
            Ok(Box::new(ScriptedBackend(script)))
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 64 * 48 * 3], 64, 48, 3, 0)
    }

    #[test]
    fn test_new_selects_probe_result() {
        let factory = FakeFactory::new(&[Backend::Fer, Backend::MediaPipe]);
        let detector = EmotionDetector::new(Box::new(factory));
        assert_eq!(detector.backend(), Backend::Fer);
    }

    #[test]
    fn test_nothing_available_selects_none_and_returns_sentinel() {
        let detector_factory = FakeFactory::new(&[]);
        let mut detector = EmotionDetector::new(Box::new(detector_factory));
        assert_eq!(detector.backend(), Backend::None);
        assert_eq!(detector.get_emotion(&frame()), DetectionResult::unknown());
    }

    #[test]
    fn test_returns_backend_result() {
        let factory = FakeFactory::new(&[Backend::DeepFace])
            .script(Backend::DeepFace, Script::Returns(EmotionLabel::Happy, 0.8));
        let mut detector = EmotionDetector::new(Box::new(factory));
        assert_eq!(
            detector.get_emotion(&frame()),
            DetectionResult::new(EmotionLabel::Happy, 0.8)
        );
    }

    #[test]
    fn test_backend_failure_becomes_sentinel() {
        let factory = FakeFactory::new(&[Backend::Fer]).script(Backend::Fer, Script::Fails);
        let mut detector = EmotionDetector::new(Box::new(factory));
        assert_eq!(detector.get_emotion(&frame()), DetectionResult::unknown());
        // and keeps doing so without panicking
        assert_eq!(detector.get_emotion(&frame()), DetectionResult::unknown());
    }

    #[test]
    fn test_handle_is_built_lazily_and_once() {
        let factory = FakeFactory::new(&[Backend::MediaPipe])
            .script(Backend::MediaPipe, Script::Returns(EmotionLabel::Neutral, 0.4));
        let created = factory.created.clone();
        let mut detector = EmotionDetector::new(Box::new(factory));
        assert_eq!(created.load(Ordering::SeqCst), 0);

        for _ in 0..3 {
            detector.get_emotion(&frame());
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_construction_is_not_retried() {
        let mut factory = FakeFactory::new(&[Backend::Fer]);
        factory.unbuildable.push(Backend::Fer);
        let created = factory.created.clone();
        let mut detector = EmotionDetector::new(Box::new(factory));

        assert_eq!(detector.get_emotion(&frame()), DetectionResult::unknown());
        assert_eq!(detector.get_emotion(&frame()), DetectionResult::unknown());
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_forced_backend_skips_probe() {
        let factory = FakeFactory::new(&[Backend::DeepFace])
            .script(Backend::MediaPipe, Script::Returns(EmotionLabel::Surprise, 1.0));
        let mut detector =
            EmotionDetector::from_preference(Box::new(factory), Some(Backend::MediaPipe));
        assert_eq!(detector.backend(), Backend::MediaPipe);
        assert_eq!(detector.get_emotion(&frame()).label(), EmotionLabel::Surprise);
    }

    #[test]
    fn test_set_backend_affects_subsequent_calls_only() {
        let factory = FakeFactory::new(&[Backend::Fer])
            .script(Backend::Fer, Script::Returns(EmotionLabel::Sad, 0.6));
        let mut detector = EmotionDetector::new(Box::new(factory));
        let before = detector.get_emotion(&frame());
        assert_eq!(before.label(), EmotionLabel::Sad);

        detector.set_backend(Backend::None);
        assert_eq!(detector.get_emotion(&frame()), DetectionResult::unknown());
        assert_eq!(before.label(), EmotionLabel::Sad);

        detector.set_backend(Backend::Fer);
        assert_eq!(detector.get_emotion(&frame()).label(), EmotionLabel::Sad);
    }

    #[test]
    fn test_reprobe_returns_to_probe_choice() {
        let factory = FakeFactory::new(&[Backend::MediaPipe]);
        let mut detector = EmotionDetector::with_backend(Box::new(factory), Backend::None);
        assert_eq!(detector.reprobe(), Backend::MediaPipe);
        assert_eq!(detector.backend(), Backend::MediaPipe);
    }

    #[test]
    fn test_malformed_frame_is_sentinel_without_building() {
        let factory = FakeFactory::new(&[Backend::Fer])
            .script(Backend::Fer, Script::Returns(EmotionLabel::Happy, 0.9));
        let created = factory.created.clone();
        let mut detector = EmotionDetector::new(Box::new(factory));

        let bad = Frame::new(vec![], 0, 0, 3, 0);
        assert_eq!(detector.get_emotion(&bad), DetectionResult::unknown());
        let two_channel = Frame::new(vec![0; 8], 2, 2, 2, 0);
        assert_eq!(detector.get_emotion(&two_channel), DetectionResult::unknown());
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_results_always_in_closed_set_and_range() {
        for backend in Backend::PRIORITY {
            let factory = FakeFactory::new(Backend::PRIORITY)
                .script(Backend::DeepFace, Script::Returns(EmotionLabel::Happy, 0.8))
                .script(Backend::Fer, Script::Fails)
                .script(Backend::MediaPipe, Script::Returns(EmotionLabel::Neutral, 0.4));
            let mut detector = EmotionDetector::with_backend(Box::new(factory), *backend);
            let r = detector.get_emotion(&frame());
            assert!(EmotionLabel::ALL.contains(&r.label()));
            assert!((0.0..=1.0).contains(&r.confidence()));
        }
    }

    #[test]
    fn test_availability_lists_all_backends_in_order() {
        let factory = FakeFactory::new(&[Backend::MediaPipe, Backend::None]);
        let detector = EmotionDetector::with_backend(Box::new(factory), Backend::None);
        assert_eq!(
            detector.availability(),
            vec![
                (Backend::DeepFace, false),
                (Backend::Fer, false),
                (Backend::MediaPipe, true),
                (Backend::None, true),
            ]
        );
    }
}
