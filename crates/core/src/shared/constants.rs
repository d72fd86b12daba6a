/// BlazeFace short-range face detector, shared by the `fer` and `mediapipe` backends.
pub const FACE_DETECTOR_MODEL_NAME: &str = "blazeface_short_range.onnx";

/// FER+ expression classifier (8 classes, 64x64 grayscale input).
pub const EXPRESSION_MODEL_NAME: &str = "emotion-ferplus-8.onnx";
pub const EXPRESSION_MODEL_URL: &str =
    "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/emotion_ferplus/model/emotion-ferplus-8.onnx";

/// MediaPipe face mesh (468 landmarks, 192x192 RGB input).
pub const FACE_MESH_MODEL_NAME: &str = "face_mesh_192.onnx";

/// Every model the workspace knows about, with its public download URL if one exists.
pub const MODELS: &[(&str, Option<&str>)] = &[
    (FACE_DETECTOR_MODEL_NAME, None),
    (EXPRESSION_MODEL_NAME, Some(EXPRESSION_MODEL_URL)),
    (FACE_MESH_MODEL_NAME, None),
];

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Directory name used under the platform cache/config directories.
pub const APP_DIR_NAME: &str = "MoodMirror";

pub const DEFAULT_LOG_PATH: &str = "mood_log.csv";
pub const DEFAULT_DEBUG_FRAME_PATH: &str = "debug_frame.jpg";
pub const DEFAULT_HISTORY_ROWS: usize = 10;
