use ndarray::ArrayView3;

/// Channel ordering of a 3-channel frame.
///
/// Camera capture produces BGR (the convention of most capture stacks);
/// ONNX models and image encoders expect RGB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorOrder {
    Bgr,
    Rgb,
}

/// A single video/image frame: contiguous bytes in row-major order.
///
/// Colour order is tracked explicitly so adapters convert once, at the
/// point where a model or encoder needs a specific ordering.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    order: ColorOrder,
}

impl Frame {
    /// Builds an RGB frame. Use [`Frame::with_order`] for BGR sources.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            order: ColorOrder::Rgb,
        }
    }

    pub fn with_order(mut self, order: ColorOrder) -> Self {
        self.order = order;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn order(&self) -> ColorOrder {
        self.order
    }

    /// True for a non-empty 3-channel frame whose buffer matches its dimensions.
    ///
    /// Release builds skip the constructor's length assertion, so adapters
    /// check this before indexing into pixel data.
    pub fn is_well_formed(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.channels == 3
            && self.data.len() == self.width as usize * self.height as usize * 3
    }

    /// Returns an RGB copy of this frame (a plain clone if already RGB).
    pub fn to_rgb(&self) -> Frame {
        match self.order {
            ColorOrder::Rgb => self.clone(),
            ColorOrder::Bgr => {
                let mut data = self.data.clone();
                if self.channels >= 3 {
                    for px in data.chunks_exact_mut(self.channels as usize) {
                        px.swap(0, 2);
                    }
                }
                self.derive(data, ColorOrder::Rgb)
            }
        }
    }

    /// Horizontally flipped copy, as seen in a mirror.
    pub fn mirrored(&self) -> Frame {
        let c = self.channels as usize;
        let row_len = self.width as usize * c;
        let mut data = Vec::with_capacity(self.data.len());
        if row_len > 0 {
            for row in self.data.chunks_exact(row_len) {
                for px in row.chunks_exact(c).rev() {
                    data.extend_from_slice(px);
                }
            }
        }
        self.derive(data, self.order)
    }

    /// Panics if the buffer does not match the dimensions; call
    /// [`Frame::is_well_formed`] first on untrusted frames.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn derive(&self, data: Vec<u8>, order: ColorOrder) -> Frame {
        Frame {
            data,
            width: self.width,
            height: self.height,
            channels: self.channels,
            index: self.index,
            order,
        }
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
