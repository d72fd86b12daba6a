//! Client for a DeepFace-compatible analysis service.
//!
//! The service exposes `POST {base}/analyze` taking a base64 data URI and
//! returning one record per face; see [`super::deepface_response`] for the
//! accepted response shapes.

use std::io::Cursor;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;

use crate::emotion::domain::backend::{BackendError, EmotionBackend};
use crate::emotion::domain::detection_result::DetectionResult;
use crate::shared::frame::Frame;

use super::deepface_response::AnalyzeResponse;

/// Upper bound for the reachability check; probing must stay quick.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    img: String,
    actions: [&'a str; 1],
    enforce_detection: bool,
}

pub struct DeepFaceBackend {
    client: reqwest::blocking::Client,
    analyze_url: String,
}

impl DeepFaceBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok(Self {
            client,
            analyze_url: analyze_url(base_url),
        })
    }

    /// True if anything answers at `base_url`, whatever the status code.
    pub fn probe(base_url: &str) -> bool {
        let client = match reqwest::blocking::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                log::debug!("DeepFace probe could not build HTTP client: {e}");
                return false;
            }
        };
        match client.get(base_url).send() {
            Ok(response) => {
                log::debug!("DeepFace service at {base_url} answered {}", response.status());
                true
            }
            Err(e) => {
                log::debug!("DeepFace service at {base_url} unreachable: {e}");
                false
            }
        }
    }
}

impl EmotionBackend for DeepFaceBackend {
    fn analyze(&mut self, frame: &Frame) -> Result<DetectionResult, BackendError> {
        let body = request_body(frame)?;
        let response = self
            .client
            .post(&self.analyze_url)
            .json(&body)
            .send()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        if !status.is_success() {
            log::debug!("DeepFace answered {status}: {text}");
            return Err(BackendError::Request(format!("HTTP {status}")));
        }

        let parsed = AnalyzeResponse::parse(&text).map_err(|e| {
            log::debug!("Undecodable DeepFace response: {text}");
            BackendError::MalformedResponse(e.to_string())
        })?;
        let result = parsed.normalize();
        if result.is_unknown() {
            log::debug!("DeepFace response without a usable emotion: {text}");
        }
        Ok(result)
    }
}

fn analyze_url(base_url: &str) -> String {
    format!("{}/analyze", base_url.trim_end_matches('/'))
}

fn request_body(frame: &Frame) -> Result<AnalyzeRequest<'static>, BackendError> {
    Ok(AnalyzeRequest {
        img: format!("data:image/jpeg;base64,{}", STANDARD.encode(encode_jpeg(frame)?)),
        actions: ["emotion"],
        enforce_detection: false,
    })
}

/// JPEG bytes of the frame in RGB order.
fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, BackendError> {
    if !frame.is_well_formed() {
        return Err(BackendError::InvalidFrame(format!(
            "{}x{}x{}",
            frame.width(),
            frame.height(),
            frame.channels()
        )));
    }
    let rgb = frame.to_rgb();
    let img = image::RgbImage::from_raw(rgb.width(), rgb.height(), rgb.data().to_vec())
        .ok_or_else(|| BackendError::Encode("buffer does not match dimensions".into()))?;
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .map_err(|e| BackendError::Encode(e.to_string()))?;
    Ok(bytes)
}
