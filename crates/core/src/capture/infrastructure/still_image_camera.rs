use std::path::{Path, PathBuf};

use crate::capture::domain::camera::{Camera, CaptureError};
use crate::shared::frame::{ColorOrder, Frame};

/// Presents one image file as an endless stream of identical frames.
///
/// Used for offline demos and for diagnosing backends against a known
/// picture without a webcam.
pub struct StillImageCamera {
    path: PathBuf,
    image: Option<Frame>,
    frame_index: usize,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            image: None,
            frame_index: 0,
        }
    }
}

/// Decodes an image file into a BGR frame, matching live capture.
fn load_bgr(path: &Path) -> Result<Frame, CaptureError> {
    let img = image::open(path)
        .map_err(|e| CaptureError::Open {
            source_name: path.display().to_string(),
            reason: e.to_string(),
        })?
        .to_rgb8();
    let (width, height) = img.dimensions();
    let mut data = img.into_raw();
    for px in data.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    Ok(Frame::new(data, width, height, 3, 0).with_order(ColorOrder::Bgr))
}

impl Camera for StillImageCamera {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.image.is_none() {
            let frame = load_bgr(&self.path)?;
            log::info!(
                "Loaded still image {} ({}x{})",
                self.path.display(),
                frame.width(),
                frame.height()
            );
            self.image = Some(frame);
            self.frame_index = 0;
        }
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        let image = self.image.as_ref().ok_or(CaptureError::NotStarted)?;
        let frame = Frame::new(
            image.data().to_vec(),
            image.width(),
            image.height(),
            image.channels(),
            self.frame_index,
        )
        .with_order(image.order());
        self.frame_index += 1;
        Ok(frame)
    }

    fn stop(&mut self) {
        self.image = None;
    }

    fn is_running(&self) -> bool {
        self.image.is_some()
    }

    fn describe(&self) -> String {
        format!("still image {}", self.path.display())
    }
}
