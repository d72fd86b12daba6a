//! Frame-to-tensor preprocessing shared by the ONNX adapters.
//!
//! All functions sample with nearest-neighbour at pixel centres and expect
//! a well-formed 3-channel RGB frame.

use ndarray::Array4;

use crate::shared::face_box::FaceBox;
use crate::shared::frame::Frame;

/// Integer pixel window `[x0, x1) x [y0, y1)` of `face` inside the frame.
///
/// Returns `None` when nothing of the box lies inside the frame.
pub fn crop_window(frame: &Frame, face: &FaceBox) -> Option<(usize, usize, usize, usize)> {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let x0 = face.x.max(0.0).floor();
    let y0 = face.y.max(0.0).floor();
    let x1 = (face.x + face.width).min(fw).ceil();
    let y1 = (face.y + face.height).min(fh).ceil();
    if x1 - x0 < 1.0 || y1 - y0 < 1.0 {
        return None;
    }
    Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
}

/// Resize a crop to `size x size` RGB, normalized to [0,1], NCHW float32.
pub fn crop_resize_nchw(
    frame: &Frame,
    window: (usize, usize, usize, usize),
    size: usize,
) -> Array4<f32> {
    let src = frame.as_ndarray();
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for_each_sample(window, size, |y, x, sy, sx| {
        for c in 0..3 {
            tensor[[0, c, y, x]] = src[[sy, sx, c]] as f32 / 255.0;
        }
    });
    tensor
}

/// Resize a crop to `size x size` single-channel luminance in 0..=255.
pub fn crop_resize_gray(
    frame: &Frame,
    window: (usize, usize, usize, usize),
    size: usize,
) -> Array4<f32> {
    let src = frame.as_ndarray();
    let mut tensor = Array4::<f32>::zeros((1, 1, size, size));
    for_each_sample(window, size, |y, x, sy, sx| {
        let r = src[[sy, sx, 0]] as f32;
        let g = src[[sy, sx, 1]] as f32;
        let b = src[[sy, sx, 2]] as f32;
        tensor[[0, 0, y, x]] = 0.299 * r + 0.587 * g + 0.114 * b;
    });
    tensor
}

/// Whole frame resized to `size x size`, normalized NCHW.
pub fn resize_nchw(frame: &Frame, size: usize) -> Array4<f32> {
    let window = (0, 0, frame.width() as usize, frame.height() as usize);
    crop_resize_nchw(frame, window, size)
}

fn for_each_sample(
    (x0, y0, x1, y1): (usize, usize, usize, usize),
    size: usize,
    mut f: impl FnMut(usize, usize, usize, usize),
) {
    let crop_w = x1 - x0;
    let crop_h = y1 - y0;
    for y in 0..size {
        let sy = y0 + (((y as f64 + 0.5) * crop_h as f64 / size as f64) as usize).min(crop_h - 1);
        for x in 0..size {
            let sx =
                x0 + (((x as f64 + 0.5) * crop_w as f64 / size as f64) as usize).min(crop_w - 1);
            f(y, x, sy, sx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_left_half_white(w: u32, h: u32) -> Frame {
        let mut data = vec![0u8; (w * h * 3) as usize];
        for y in 0..h {
            for x in 0..w / 2 {
                let i = ((y * w + x) * 3) as usize;
                data[i..i + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        Frame::new(data, w, h, 3, 0)
    }

    #[test]
    fn test_resize_shape() {
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        assert_eq!(resize_nchw(&frame, 128).shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_resize_normalized() {
        let frame = Frame::new(vec![255u8; 50 * 50 * 3], 50, 50, 3, 0);
        let tensor = resize_nchw(&frame, 128);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_crop_samples_inside_window_only() {
        let frame = frame_with_left_half_white(100, 40);
        // right half is black
        let tensor = crop_resize_nchw(&frame, (50, 0, 100, 40), 16);
        assert!(tensor.iter().all(|&v| v == 0.0));
        let tensor = crop_resize_nchw(&frame, (0, 0, 50, 40), 16);
        assert!(tensor.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_gray_keeps_byte_range() {
        let frame = Frame::new(vec![255u8; 8 * 8 * 3], 8, 8, 3, 0);
        let tensor = crop_resize_gray(&frame, (0, 0, 8, 8), 64);
        assert_eq!(tensor.shape(), &[1, 1, 64, 64]);
        assert!((tensor[[0, 0, 10, 10]] - 255.0).abs() < 0.01);
    }

    #[test]
    fn test_crop_window_clamps_to_frame() {
        let frame = Frame::new(vec![0u8; 20 * 10 * 3], 20, 10, 3, 0);
        let window = crop_window(&frame, &FaceBox::new(-5.0, 2.5, 30.0, 4.0, 1.0));
        assert_eq!(window, Some((0, 2, 20, 7)));
    }

    #[test]
    fn test_crop_window_outside_frame() {
        let frame = Frame::new(vec![0u8; 20 * 10 * 3], 20, 10, 3, 0);
        assert_eq!(crop_window(&frame, &FaceBox::new(30.0, 0.0, 5.0, 5.0, 1.0)), None);
        assert_eq!(crop_window(&frame, &FaceBox::new(0.0, 0.0, 0.0, 5.0, 1.0)), None);
    }
}
