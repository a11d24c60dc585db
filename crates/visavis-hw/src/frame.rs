//! Frame type, YUYV conversion, and JPEG data-URL encoding.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageError};

/// A captured grayscale camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Grayscale pixel data (width * height bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

impl Frame {
    /// Encode this frame as a JPEG data URL, the transport form the
    /// recognition service expects in a `recognize` request body.
    pub fn to_jpeg_data_url(&self, quality: u8) -> Result<String, FrameError> {
        let expected = (self.width * self.height) as usize;
        if self.data.len() < expected {
            return Err(FrameError::InvalidLength { expected, actual: self.data.len() });
        }

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality).encode(
            &self.data[..expected],
            self.width,
            self.height,
            ExtendedColorType::L8,
        )?;

        Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(&jpeg)))
    }
}

/// Convert packed YUYV (4:2:2) to grayscale by extracting the Y channel.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V].
/// Grayscale = every even-indexed byte.
pub fn yuyv_to_grayscale(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("jpeg encoding failed: {0}")]
    Encode(#[from] ImageError),
}
