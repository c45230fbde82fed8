//! Image Acquisition Layer
//!
//! Normalizes heterogeneous acquisition paths (camera capture, file upload)
//! into a single validated [`ImageAsset`] shape. Validation happens here so
//! the rest of the pipeline never sees empty or unsupported input.

pub mod asset;

use std::io::Cursor;

use image::ImageFormat;
use tracing::debug;

use crate::error::ScanError;

pub use asset::ImageAsset;

/// Default cap on accepted image size (bytes).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Image acquisition configuration
#[derive(Debug, Clone)]
pub struct ImageSourceConfig {
    /// Raster formats the pipeline accepts
    pub allowed_formats: Vec<ImageFormat>,
    /// Maximum accepted image size in bytes
    pub max_bytes: usize,
}

impl Default for ImageSourceConfig {
    fn default() -> Self {
        Self {
            allowed_formats: vec![ImageFormat::Jpeg, ImageFormat::Png],
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// Validates raw image bytes and produces [`ImageAsset`]s.
pub struct ImageSource {
    config: ImageSourceConfig,
}

impl ImageSource {
    /// Create an image source accepting JPEG and PNG up to the default limit.
    pub fn new() -> Self {
        Self::with_config(ImageSourceConfig::default())
    }

    /// Create an image source with a custom format whitelist and size limit.
    pub fn with_config(config: ImageSourceConfig) -> Self {
        Self { config }
    }

    /// Validate raw bytes from a camera capture or file upload.
    ///
    /// The format is sniffed from the content, never trusted from a file
    /// extension or declared MIME type. Only the header is decoded to obtain
    /// dimensions; full pixel decoding is left to the extraction backend.
    pub fn acquire(&self, data: Vec<u8>) -> Result<ImageAsset, ScanError> {
        if data.is_empty() {
            return Err(ScanError::EmptyInput);
        }
        if data.len() > self.config.max_bytes {
            return Err(ScanError::OversizedInput {
                size: data.len(),
                limit: self.config.max_bytes,
            });
        }

        let format = image::guess_format(&data)
            .map_err(|_| ScanError::UnsupportedFormat("unrecognized image data".to_string()))?;

        if !self.config.allowed_formats.contains(&format) {
            return Err(ScanError::UnsupportedFormat(
                format.to_mime_type().to_string(),
            ));
        }

        let (width, height) = image::ImageReader::with_format(Cursor::new(&data), format)
            .into_dimensions()
            .map_err(|e| ScanError::UnsupportedFormat(format!("undecodable image: {e}")))?;

        debug!(
            width,
            height,
            bytes = data.len(),
            mime = format.to_mime_type(),
            "acquired image"
        );

        Ok(ImageAsset::new(
            data,
            width,
            height,
            format.to_mime_type().to_string(),
        ))
    }
}

impl Default for ImageSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smallest valid 1x1 grayscale PNG, for tests across the crate.
    pub(crate) fn tiny_png() -> Vec<u8> {
        let img = image::GrayImage::from_pixel(1, 1, image::Luma([128u8]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_acquire_valid_png() {
        let source = ImageSource::new();
        let asset = source.acquire(tiny_png()).unwrap();
        assert_eq!(asset.dimensions(), (1, 1));
        assert_eq!(asset.mime_type(), "image/png");
        assert!(!asset.data().is_empty());
    }

    #[test]
    fn test_acquire_empty_input() {
        let source = ImageSource::new();
        let err = source.acquire(Vec::new()).unwrap_err();
        assert!(matches!(err, ScanError::EmptyInput));
    }

    #[test]
    fn test_acquire_garbage_bytes() {
        let source = ImageSource::new();
        let err = source.acquire(vec![0xDE, 0xAD, 0xBE, 0xEF]).unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_acquire_disallowed_format() {
        // A valid BMP is a real image but outside the default whitelist.
        let img = image::GrayImage::from_pixel(1, 1, image::Luma([0u8]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Bmp)
            .unwrap();

        let source = ImageSource::new();
        let err = source.acquire(buf).unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_acquire_oversized_input() {
        let source = ImageSource::with_config(ImageSourceConfig {
            max_bytes: 8,
            ..ImageSourceConfig::default()
        });
        let err = source.acquire(tiny_png()).unwrap_err();
        assert!(matches!(err, ScanError::OversizedInput { .. }));
    }

    #[test]
    fn test_truncated_png_rejected() {
        let mut data = tiny_png();
        data.truncate(12); // magic survives, header does not
        let source = ImageSource::new();
        let err = source.acquire(data).unwrap_err();
        assert!(matches!(err, ScanError::UnsupportedFormat(_)));
    }
}
