pub mod backend;
pub mod detection_result;
pub mod emotion_detector;
pub mod emotion_label;
pub mod face_expression;
pub mod geometry_heuristic;
