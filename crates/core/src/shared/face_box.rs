/// Axis-aligned face bounding box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Detector confidence in [0, 1].
    pub score: f64,
}

impl FaceBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64, score: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            score,
        }
    }

    /// Corners as `[x1, y1, x2, y2]`.
    pub fn corners(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Grows the box around its center by `factor` (0.25 = 25% larger on
    /// each axis) and clamps it to the frame bounds.
    pub fn expanded(&self, factor: f64, frame_width: u32, frame_height: u32) -> FaceBox {
        let cx = self.x + self.width / 2.0;
        let cy = self.y + self.height / 2.0;
        let w = self.width * (1.0 + factor);
        let h = self.height * (1.0 + factor);
        let x1 = (cx - w / 2.0).max(0.0);
        let y1 = (cy - h / 2.0).max(0.0);
        let x2 = (cx + w / 2.0).min(frame_width as f64);
        let y2 = (cy + h / 2.0).min(frame_height as f64);
        FaceBox::new(x1, y1, (x2 - x1).max(0.0), (y2 - y1).max(0.0), self.score)
    }

    /// Boxes smaller than one pixel on either axis cannot be cropped.
    pub fn is_degenerate(&self) -> bool {
        self.width < 1.0 || self.height < 1.0
    }
}
