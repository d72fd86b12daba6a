use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::settings::Settings;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use crate::detection::infrastructure::onnx_face_mesh_estimator::OnnxFaceMeshEstimator;
use crate::emotion::domain::backend::{Backend, BackendError, BackendFactory, EmotionBackend};
use crate::emotion::domain::geometry_heuristic::GeometryHeuristic;
use crate::shared::constants::{
    EXPRESSION_MODEL_NAME, FACE_DETECTOR_MODEL_NAME, FACE_MESH_MODEL_NAME,
};
use crate::shared::model_resolver;

use super::deepface_backend::DeepFaceBackend;
use super::expression_backend::ExpressionBackend;
use super::face_mesh_backend::FaceMeshBackend;
use super::null_backend::NullEmotionBackend;
use super::onnx_ferplus_classifier::OnnxFerPlusClassifier;

/// What the backends need to know about the environment.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendConfig {
    pub deepface_url: Option<String>,
    pub disable_deepface: bool,
    pub model_dir: Option<PathBuf>,
    pub face_confidence: f64,
    pub request_timeout: Duration,
}

impl From<&Settings> for BackendConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            deepface_url: settings.deepface_url.clone(),
            disable_deepface: settings.disable_deepface,
            model_dir: settings.model_dir.clone(),
            face_confidence: settings.face_confidence,
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
        }
    }
}

/// Model files each ONNX-based backend needs.
pub fn required_models(backend: Backend) -> &'static [&'static str] {
    match backend {
        Backend::Fer => &[FACE_DETECTOR_MODEL_NAME, EXPRESSION_MODEL_NAME],
        Backend::MediaPipe => &[FACE_DETECTOR_MODEL_NAME, FACE_MESH_MODEL_NAME],
        Backend::DeepFace | Backend::None => &[],
    }
}

/// Builds the production backends: HTTP for `deepface`, ONNX for `fer`
/// and `mediapipe`.
pub struct DefaultBackendFactory {
    config: BackendConfig,
}

impl DefaultBackendFactory {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    fn deepface_url(&self) -> Option<&str> {
        if self.config.disable_deepface {
            return None;
        }
        self.config.deepface_url.as_deref().filter(|u| !u.is_empty())
    }

    fn model_path(&self, name: &str) -> Result<PathBuf, BackendError> {
        model_resolver::locate(name, self.config.model_dir.as_deref())
            .ok_or_else(|| BackendError::ModelMissing(name.to_string()))
    }

    fn face_detector(&self) -> Result<Box<dyn FaceDetector>, BackendError> {
        let path = self.model_path(FACE_DETECTOR_MODEL_NAME)?;
        let detector = OnnxBlazefaceDetector::new(&path, self.config.face_confidence)
            .map_err(|e| load_error(&path, e))?;
        Ok(Box::new(detector))
    }
}

fn load_error(path: &Path, e: Box<dyn std::error::Error>) -> BackendError {
    BackendError::Inference(format!("failed to load {}: {e}", path.display()))
}

impl BackendFactory for DefaultBackendFactory {
    fn is_available(&self, backend: Backend) -> bool {
        match backend {
            Backend::DeepFace => self.deepface_url().is_some_and(DeepFaceBackend::probe),
            Backend::Fer | Backend::MediaPipe => required_models(backend).iter().all(|name| {
                let found = model_resolver::locate(name, self.config.model_dir.as_deref());
                if found.is_none() {
                    log::debug!("{backend} unavailable: model {name} not found");
                }
                found.is_some()
            }),
            Backend::None => true,
        }
    }

    fn create(&self, backend: Backend) -> Result<Box<dyn EmotionBackend>, BackendError> {
        match backend {
            Backend::DeepFace => {
                let url = self
                    .deepface_url()
                    .ok_or(BackendError::NotConfigured(Backend::DeepFace))?;
                Ok(Box::new(DeepFaceBackend::new(url, self.config.request_timeout)?))
            }
            Backend::Fer => {
                let detector = self.face_detector()?;
                let path = self.model_path(EXPRESSION_MODEL_NAME)?;
                let classifier =
                    OnnxFerPlusClassifier::new(&path).map_err(|e| load_error(&path, e))?;
                Ok(Box::new(ExpressionBackend::new(detector, Box::new(classifier))))
            }
            Backend::MediaPipe => {
                let detector = self.face_detector()?;
                let path = self.model_path(FACE_MESH_MODEL_NAME)?;
                let estimator =
                    OnnxFaceMeshEstimator::new(&path, detector).map_err(|e| load_error(&path, e))?;
                Ok(Box::new(FaceMeshBackend::new(
                    Box::new(estimator),
                    GeometryHeuristic::default(),
                )))
            }
            Backend::None => Ok(Box::new(NullEmotionBackend)),
        }
    }
}
