//! Emotion detection with backend probing and graceful fallback.
//!
//! Bounded contexts are split into `domain` (value types, traits, pure
//! logic) and `infrastructure` (ONNX, HTTP, ffmpeg and filesystem adapters).

pub mod capture;
pub mod config;
pub mod detection;
pub mod emotion;
pub mod history;
pub mod pipeline;
pub mod shared;
