//! Tesseract OCR backend via leptess
//!
//! Recognition runs on the blocking thread pool; the async front honors the
//! cancellation token by abandoning the blocking task and reporting
//! `Cancelled`. Tesseract itself cannot be interrupted mid-page, so the
//! abandoned task finishes in the background and its output is dropped.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ExtractedText, ExtractionError, LineConfidence, TextExtractor};
use crate::capture::ImageAsset;

/// Text extractor backed by a local Tesseract installation.
pub struct TesseractExtractor {
    /// Tesseract language string (e.g. "eng" or "eng+deu")
    language: String,
}

impl TesseractExtractor {
    pub fn new(language: impl Into<String>) -> Self {
        let language = language.into();
        let language = if language.is_empty() {
            "eng".to_string()
        } else {
            language
        };
        Self { language }
    }
}

#[async_trait]
impl TextExtractor for TesseractExtractor {
    async fn extract(
        &self,
        asset: &ImageAsset,
        cancel: &CancellationToken,
    ) -> Result<ExtractedText, ExtractionError> {
        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        let language = self.language.clone();
        let data = asset.data().to_vec();
        let handle = tokio::task::spawn_blocking(move || recognize(&language, &data));

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("extraction cancelled, abandoning blocking OCR task");
                Err(ExtractionError::Cancelled)
            }
            joined = handle => match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!("OCR task panicked: {e}");
                    Err(ExtractionError::Unreadable(format!("OCR task failed: {e}")))
                }
            },
        }
    }
}

/// Run Tesseract over encoded image bytes. Blocking.
fn recognize(language: &str, data: &[u8]) -> Result<ExtractedText, ExtractionError> {
    let mut lt = leptess::LepTess::new(None, language)
        .map_err(|e| ExtractionError::Unreadable(format!("tesseract init failed: {e}")))?;

    lt.set_image_from_mem(data)
        .map_err(|e| ExtractionError::Unreadable(format!("image rejected by tesseract: {e}")))?;

    let text = lt
        .get_utf8_text()
        .map_err(|e| ExtractionError::Unreadable(format!("recognition failed: {e}")))?;

    // Tesseract reports a 0-100 mean confidence over the whole page; expose
    // it as a single whole-text line hint.
    let mean = lt.mean_text_conf();
    let lines = if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![LineConfidence {
            text: text.trim().to_string(),
            confidence: (mean.clamp(0, 100) as f32) / 100.0,
        }]
    };

    debug!(chars = text.len(), mean_confidence = mean, "OCR complete");

    Ok(ExtractedText { text, lines })
}
