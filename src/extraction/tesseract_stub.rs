//! Stub extractor used when the "tesseract" feature is disabled.
//!
//! Keeps the default build free of system library requirements
//! (tesseract/leptonica) while presenting the same type surface.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{ExtractedText, ExtractionError, TextExtractor};
use crate::capture::ImageAsset;

/// Placeholder for the Tesseract backend; always reports the image as
/// unreadable with a pointer at the missing feature flag.
pub struct TesseractExtractor {
    _language: String,
}

impl TesseractExtractor {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            _language: language.into(),
        }
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn extract(
        &self,
        _asset: &ImageAsset,
        cancel: &CancellationToken,
    ) -> Result<ExtractedText, ExtractionError> {
        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        Err(ExtractionError::Unreadable(
            "built without the \"tesseract\" feature; no OCR backend available".to_string(),
        ))
    }
}
