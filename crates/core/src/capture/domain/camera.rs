use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("camera is not started")]
    NotStarted,
    #[error("could not open {source_name}: {reason}")]
    Open { source_name: String, reason: String },
    #[error("failed to read frame: {0}")]
    Read(String),
    #[error("end of stream")]
    EndOfStream,
}

/// A live source of frames: a capture device, a replayed file or a still
/// image.
///
/// `start` acquires the underlying resource and `stop` releases it; both
/// are safe to call repeatedly. Reading from a stopped camera is an error.
pub trait Camera: Send {
    fn start(&mut self) -> Result<(), CaptureError>;

    fn read(&mut self) -> Result<Frame, CaptureError>;

    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Human-readable name of the source, for logs and prompts.
    fn describe(&self) -> String;
}
