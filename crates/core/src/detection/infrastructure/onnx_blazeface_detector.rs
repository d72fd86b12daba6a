/// BlazeFace face detector using ONNX Runtime via `ort`.
///
/// A lightweight short-range detector that provides bounding boxes only.
/// Both ONNX-based emotion backends use it to find the face to analyze.
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

use super::execution_provider::load_session;
use super::math::{bbox_iou, sigmoid};
use super::tensor::resize_nchw;

/// BlazeFace model input resolution.
const INPUT_SIZE: usize = 128;

/// Default confidence threshold.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// BlazeFace face detector backed by an ONNX Runtime session.
pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    /// Load a BlazeFace ONNX model.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        Ok(Self {
            session,
            confidence,
            anchors: generate_anchors(),
        })
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        if !frame.is_well_formed() {
            return Err("BlazeFace needs a non-empty 3-channel frame".into());
        }
        let fw = frame.width();
        let fh = frame.height();

        // 1. Preprocess: resize to 128x128, normalize to [0,1], NCHW
        let input_tensor = resize_nchw(frame, INPUT_SIZE);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // BlazeFace outputs two tensors:
        // - regressors: [1, 896, 16] (box deltas + keypoints)
        // - classificators: [1, 896, 1] (confidence scores)
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        let raw = decode(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence as f32,
            fw as f32,
            fh as f32,
        );

        // 3. NMS, highest score first
        Ok(nms(raw, NMS_IOU_THRESH))
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode anchor-relative boxes above `confidence` into frame pixels.
fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    fw: f32,
    fh: f32,
) -> Vec<FaceBox> {
    let mut dets = Vec::new();
    let size = INPUT_SIZE as f32;

    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }

        let anchor = &anchors[i];
        let reg_offset = i * 16;
        if reg_offset + 4 > reg_data.len() {
            break;
        }

        // Box center + size relative to anchor
        let cx = anchor[0] + reg_data[reg_offset] / size;
        let cy = anchor[1] + reg_data[reg_offset + 1] / size;
        let w = reg_data[reg_offset + 2] / size;
        let h = reg_data[reg_offset + 3] / size;

        let x1 = ((cx - w / 2.0) * fw).max(0.0);
        let y1 = ((cy - h / 2.0) * fh).max(0.0);
        let x2 = ((cx + w / 2.0) * fw).min(fw);
        let y2 = ((cy + h / 2.0) * fh).min(fh);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        dets.push(FaceBox::new(
            x1 as f64,
            y1 as f64,
            (x2 - x1) as f64,
            (y2 - y1) as f64,
            score as f64,
        ));
    }
    dets
}

// ---------------------------------------------------------------------------
// Anchor generation (BlazeFace short-range)
// ---------------------------------------------------------------------------

/// Generate BlazeFace anchors for the short-range model.
///
/// The short-range model uses two feature map sizes: 16×16 and 8×8,
/// with 2 and 6 anchors per cell respectively.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

fn nms(mut dets: Vec<FaceBox>, iou_thresh: f64) -> Vec<FaceBox> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<FaceBox> = Vec::new();
    for det in dets {
        let corners = det.corners();
        if keep
            .iter()
            .all(|k| bbox_iou(&k.corners(), &corners) <= iou_thresh)
        {
            keep.push(det);
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
