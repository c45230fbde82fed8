//! Image asset data structure for acquired question images

use std::time::Instant;

/// A normalized image accepted into a scan attempt.
///
/// Immutable once created: the acquisition path validates the bytes and the
/// rest of the pipeline only reads them. Discarded when the session resets.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    /// Encoded image bytes (JPEG, PNG, ...)
    data: Vec<u8>,
    /// Image width in pixels
    width: u32,
    /// Image height in pixels
    height: u32,
    /// MIME type of the encoded data
    mime_type: String,
    /// Timestamp when the image was acquired
    timestamp: Instant,
}

impl ImageAsset {
    pub(crate) fn new(data: Vec<u8>, width: u32, height: u32, mime_type: String) -> Self {
        Self {
            data,
            width,
            height,
            mime_type,
            timestamp: Instant::now(),
        }
    }

    /// Encoded image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Image dimensions as (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// MIME type of the encoded data (e.g. `image/png`).
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// When the image was acquired.
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }
}
