//! Face mesh estimation: BlazeFace locates the face, a 192x192 landmark
//! model regresses 468 points inside the expanded face crop.

use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_mesh::{FaceMesh, FaceMeshEstimator, FACE_MESH_POINTS};
use crate::shared::frame::Frame;

use super::execution_provider::load_session;
use super::math::sigmoid;
use super::tensor::{crop_resize_nchw, crop_window};

/// Landmark model input resolution.
const INPUT_SIZE: usize = 192;

/// Margin added around the detector box; the mesh model expects some context.
const CROP_EXPANSION: f64 = 0.25;

/// Presence probability below which the crop is treated as face-less.
const PRESENCE_THRESHOLD: f32 = 0.5;

pub struct OnnxFaceMeshEstimator {
    detector: Box<dyn FaceDetector>,
    session: ort::session::Session,
}

impl OnnxFaceMeshEstimator {
    pub fn new(
        model_path: &Path,
        detector: Box<dyn FaceDetector>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            detector,
            session: load_session(model_path)?,
        })
    }
}

impl FaceMeshEstimator for OnnxFaceMeshEstimator {
    fn estimate(&mut self, frame: &Frame) -> Result<Option<FaceMesh>, Box<dyn std::error::Error>> {
        let faces = self.detector.detect(frame)?;
        let Some(face) = faces.first() else {
            return Ok(None);
        };
        let crop = face.expanded(CROP_EXPANSION, frame.width(), frame.height());
        let Some(window) = crop_window(frame, &crop) else {
            return Ok(None);
        };

        let input = crop_resize_nchw(frame, window, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        if outputs.len() > 1 {
            let presence = outputs[1].try_extract_array::<f32>()?;
            if let Some(&logit) = presence.iter().next() {
                if sigmoid(logit) < PRESENCE_THRESHOLD {
                    return Ok(None);
                }
            }
        }

        let landmarks = outputs[0].try_extract_array::<f32>()?;
        let data = landmarks.as_slice().ok_or("Cannot get landmark slice")?;
        landmarks_to_frame(data, window)
            .map(Some)
            .ok_or_else(|| {
                format!(
                    "face mesh output has {} values, expected at least {}",
                    data.len(),
                    FACE_MESH_POINTS * 3
                )
                .into()
            })
    }
}

/// Map `(x, y, z)` triples in model-input pixels back to frame pixels.
fn landmarks_to_frame(data: &[f32], window: (usize, usize, usize, usize)) -> Option<FaceMesh> {
    if data.len() < FACE_MESH_POINTS * 3 {
        return None;
    }
    let (x0, y0, x1, y1) = window;
    let sx = (x1 - x0) as f64 / INPUT_SIZE as f64;
    let sy = (y1 - y0) as f64 / INPUT_SIZE as f64;
    let points = data
        .chunks_exact(3)
        .take(FACE_MESH_POINTS)
        .map(|p| (x0 as f64 + p[0] as f64 * sx, y0 as f64 + p[1] as f64 * sy))
        .collect();
    Some(FaceMesh::new(points))
}
