//! Static-frame capture for animated assets.
//!
//! Decodes the first frame of an asset and re-encodes it as a PNG data url,
//! which the shape draws while paused or under reduced motion.

use crate::fetch::{AssetFetcher, FetchError, load_src};
use base64::{Engine, engine::general_purpose::STANDARD};
use framecrop_core::{CaptureRequest, StaticFrameCache};
use thiserror::Error;

/// Capture errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Capture cancelled")]
    Cancelled,
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode PNG: {0}")]
    Encode(String),
}

/// A captured still.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    /// `data:image/png;base64,...`
    pub data_url: String,
}

/// Decode the first frame of `bytes` and return it as a PNG data url.
pub fn capture_first_frame(bytes: &[u8]) -> Result<CapturedFrame, CaptureError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| CaptureError::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let png_data = encode_png(rgba.as_raw(), width, height)?;
    Ok(CapturedFrame {
        width,
        height,
        data_url: format!("data:image/png;base64,{}", STANDARD.encode(png_data)),
    })
}

/// Encode RGBA pixel data to PNG bytes.
fn encode_png(rgba_data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CaptureError> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| CaptureError::Encode(e.to_string()))?;
        writer
            .write_image_data(rgba_data)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;
    }
    Ok(png_data)
}

/// Load and capture the asset named by `request`.
///
/// Stops early once the request is cancelled, so a stale capture does no
/// decoding work.
pub async fn run_capture(
    request: &CaptureRequest,
    fetcher: &impl AssetFetcher,
) -> Result<CapturedFrame, CaptureError> {
    if request.is_cancelled() {
        return Err(CaptureError::Cancelled);
    }
    let fetched = load_src(fetcher, &request.src).await?;
    if request.is_cancelled() {
        return Err(CaptureError::Cancelled);
    }
    capture_first_frame(&fetched.bytes)
}

/// Run a capture and hand the result to `cache`. Returns true if it was applied.
pub async fn capture_into(
    cache: &mut StaticFrameCache,
    request: CaptureRequest,
    fetcher: &impl AssetFetcher,
) -> bool {
    let result = run_capture(&request, fetcher).await.map(|frame| frame.data_url);
    cache.complete(&request, result)
}
