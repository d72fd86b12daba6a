use std::path::PathBuf;

use crate::capture::domain::camera::{Camera, CaptureError};
use crate::shared::frame::{ColorOrder, Frame};

/// libavdevice input format for live capture on this platform.
#[cfg(target_os = "linux")]
const DEVICE_FORMAT: &str = "v4l2";
#[cfg(target_os = "macos")]
const DEVICE_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
const DEVICE_FORMAT: &str = "dshow";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const DEVICE_FORMAT: &str = "v4l2";

/// Default capture device when none is configured.
#[cfg(target_os = "macos")]
pub const DEFAULT_DEVICE: &str = "0";
#[cfg(target_os = "windows")]
pub const DEFAULT_DEVICE: &str = "video=Integrated Camera";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const DEFAULT_DEVICE: &str = "/dev/video0";

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CameraSource {
    /// Capture device name as understood by libavdevice.
    Device(String),
    /// Video file replayed as if it were a camera.
    File(PathBuf),
}

impl std::fmt::Display for CameraSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraSource::Device(name) => write!(f, "{DEVICE_FORMAT} device {name}"),
            CameraSource::File(path) => write!(f, "video file {}", path.display()),
        }
    }
}

/// Decoder state for an opened source.
struct CaptureState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    video_stream_index: usize,
    width: u32,
    height: u32,
    flushing: bool,
}

/// Camera backed by ffmpeg-next (libavdevice + libavformat + libavcodec).
///
/// Every decoded frame is converted to packed BGR24, the usual camera
/// convention, and tagged as such.
pub struct FfmpegCamera {
    source: CameraSource,
    state: Option<CaptureState>,
    frame_index: usize,
}

// Safety: FfmpegCamera is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    pub fn new(source: CameraSource) -> Self {
        Self {
            source,
            state: None,
            frame_index: 0,
        }
    }

    pub fn device(name: impl Into<String>) -> Self {
        Self::new(CameraSource::Device(name.into()))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(CameraSource::File(path.into()))
    }

    fn open_error(&self, reason: impl ToString) -> CaptureError {
        CaptureError::Open {
            source_name: self.source.to_string(),
            reason: reason.to_string(),
        }
    }

    fn open_input(&self) -> Result<ffmpeg_next::format::context::Input, CaptureError> {
        ffmpeg_next::init().map_err(|e| self.open_error(e))?;
        match &self.source {
            CameraSource::File(path) => {
                ffmpeg_next::format::input(path).map_err(|e| self.open_error(e))
            }
            CameraSource::Device(name) => {
                ffmpeg_next::device::register_all();
                let format = ffmpeg_next::device::input::video()
                    .find(|f| f.name() == DEVICE_FORMAT)
                    .ok_or_else(|| {
                        self.open_error(format!("{DEVICE_FORMAT} input is not available"))
                    })?;
                let context = ffmpeg_next::format::open_with(
                    name,
                    &ffmpeg_next::format::format::Format::Input(format),
                    ffmpeg_next::Dictionary::new(),
                )
                .map_err(|e| self.open_error(e))?;
                match context {
                    ffmpeg_next::format::context::Context::Input(ictx) => Ok(ictx),
                    ffmpeg_next::format::context::Context::Output(_) => {
                        Err(self.open_error("device opened as an output"))
                    }
                }
            }
        }
    }

    fn open_state(&self) -> Result<CaptureState, CaptureError> {
        let ictx = self.open_input()?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| self.open_error("no video stream found"))?;
        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| self.open_error(e))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| self.open_error(e))?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::BGR24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| self.open_error(e))?;

        Ok(CaptureState {
            ictx,
            decoder,
            scaler,
            video_stream_index,
            width,
            height,
            flushing: false,
        })
    }
}

impl CaptureState {
    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut bgr_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler
            .run(&decoded, &mut bgr_frame)
            .map_err(|e| CaptureError::Read(e.to_string()))?;
        Ok(Some(extract_packed_pixels(
            &bgr_frame,
            self.width,
            self.height,
        )))
    }

    fn next_pixels(&mut self) -> Result<Vec<u8>, CaptureError> {
        loop {
            if let Some(pixels) = self.try_receive()? {
                return Ok(pixels);
            }
            if self.flushing {
                return Err(CaptureError::EndOfStream);
            }

            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                continue;
            };
            if stream.index() != self.video_stream_index {
                continue;
            }
            // Corrupt packets are skipped; the next keyframe recovers.
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet: {e}");
            }
        }
    }
}

impl Camera for FfmpegCamera {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.state.is_some() {
            return Ok(());
        }
        let state = self.open_state()?;
        log::info!(
            "Opened {} ({}x{})",
            self.source,
            state.width,
            state.height
        );
        self.state = Some(state);
        self.frame_index = 0;
        Ok(())
    }

    fn read(&mut self) -> Result<Frame, CaptureError> {
        let state = self.state.as_mut().ok_or(CaptureError::NotStarted)?;
        let pixels = state.next_pixels()?;
        let frame = Frame::new(pixels, state.width, state.height, 3, self.frame_index)
            .with_order(ColorOrder::Bgr);
        self.frame_index += 1;
        Ok(frame)
    }

    fn stop(&mut self) {
        if self.state.take().is_some() {
            log::info!("Released {}", self.source);
        }
    }

    fn is_running(&self) -> bool {
        self.state.is_some()
    }

    fn describe(&self) -> String {
        self.source.to_string()
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous 3-byte-per-pixel buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
/// This function strips that padding to produce a tightly-packed pixel buffer.
fn extract_packed_pixels(
    frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = frame.stride(0);
    let data = frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Encodes `num_frames` solid-colour RGB frames into an MPEG-4 file.
    fn create_test_video(
        path: &Path,
        num_frames: usize,
        width: u32,
        height: u32,
        rgb: [u8; 3],
    ) {
        ffmpeg_next::init().unwrap();
        let fps = 30;

        let mut octx = ffmpeg_next::format::output(path).unwrap();

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();

        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);

        octx.write_header().unwrap();

        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        for i in 0..num_frames {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
            );
            let stride = rgb_frame.stride(0);
            let data = rgb_frame.data_mut(0);
            for row in 0..height as usize {
                for col in 0..width as usize {
                    let offset = row * stride + col * 3;
                    data[offset..offset + 3].copy_from_slice(&rgb);
                }
            }

            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
            yuv_frame.set_pts(Some(i as i64));

            encoder.send_frame(&yuv_frame).unwrap();

            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                encoded.write_interleaved(&mut octx).unwrap();
            }
        }

        encoder.send_eof().unwrap();
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
            encoded.write_interleaved(&mut octx).unwrap();
        }

        octx.write_trailer().unwrap();
    }

    fn test_video(dir: &Path, frames: usize) -> PathBuf {
        let path = dir.join("replay.mp4");
        create_test_video(&path, frames, 160, 120, [40, 120, 220]);
        path
    }

    #[test]
    fn test_replays_every_frame_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = FfmpegCamera::file(test_video(dir.path(), 5));
        camera.start().unwrap();

        for i in 0..5 {
            let frame = camera.read().unwrap();
            assert_eq!(frame.index(), i);
            assert_eq!((frame.width(), frame.height()), (160, 120));
            assert_eq!(frame.data().len(), 160 * 120 * 3);
        }
        assert!(matches!(camera.read(), Err(CaptureError::EndOfStream)));
    }

    #[test]
    fn test_frames_are_bgr() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = FfmpegCamera::file(test_video(dir.path(), 1));
        camera.start().unwrap();
        let frame = camera.read().unwrap();
        assert_eq!(frame.order(), ColorOrder::Bgr);

        // blue dominates red in the source colour; lossy codec, so compare loosely
        let px = &frame.data()[..3];
        assert!(px[0] > px[2], "expected BGR order, got {px:?}");
    }

    #[test]
    fn test_read_before_start_fails() {
        let mut camera = FfmpegCamera::file("/nonexistent/replay.mp4");
        assert!(!camera.is_running());
        assert!(matches!(camera.read(), Err(CaptureError::NotStarted)));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let mut camera = FfmpegCamera::file("/nonexistent/replay.mp4");
        assert!(matches!(camera.start(), Err(CaptureError::Open { .. })));
        assert!(!camera.is_running());
    }

    #[test]
    fn test_stop_releases_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = FfmpegCamera::file(test_video(dir.path(), 2));
        camera.start().unwrap();
        assert!(camera.is_running());
        camera.stop();
        camera.stop();
        assert!(!camera.is_running());
        assert!(matches!(camera.read(), Err(CaptureError::NotStarted)));
    }

    #[test]
    fn test_restart_rewinds_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = FfmpegCamera::file(test_video(dir.path(), 3));
        camera.start().unwrap();
        camera.read().unwrap();
        camera.stop();
        camera.start().unwrap();
        assert_eq!(camera.read().unwrap().index(), 0);
    }

    #[test]
    fn test_describe_names_source() {
        let camera = FfmpegCamera::device("/dev/video7");
        assert!(camera.describe().contains("/dev/video7"));
    }
}
