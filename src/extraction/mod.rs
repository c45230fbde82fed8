//! Text Extraction Layer
//!
//! Defines the contract the pipeline consumes to turn an image into text.
//! The session treats extraction as a capability behind [`TextExtractor`];
//! the concrete backend (local Tesseract, a remote recognition service, a
//! test fake) is the hosting application's choice.
//!
//! The real Tesseract backend is compiled with the "tesseract" feature flag.
//! When the feature is disabled, a stub implementation is provided.

#[cfg(feature = "tesseract")]
mod tesseract;
#[cfg(not(feature = "tesseract"))]
mod tesseract_stub;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::capture::ImageAsset;

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractExtractor;
#[cfg(not(feature = "tesseract"))]
pub use tesseract_stub::TesseractExtractor;

/// Confidence hint for a single recognized line.
#[derive(Debug, Clone)]
pub struct LineConfidence {
    /// Recognized line content
    pub text: String,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
}

/// Text recovered from an image by a recognition backend.
///
/// Produced once per scan attempt and owned by the session that requested it.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Full recognized text
    pub text: String,
    /// Optional per-line confidence hints; empty when the backend has none
    pub lines: Vec<LineConfidence>,
}

impl ExtractedText {
    /// Wrap plain text with no confidence hints.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lines: Vec::new(),
        }
    }
}

/// Errors the recognition step can fail with.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    /// The backend could not make sense of the image.
    #[error("image unreadable: {0}")]
    Unreadable(String),
    /// The backend gave up after its own deadline.
    #[error("recognition timed out")]
    Timeout,
    /// The caller cancelled the attempt.
    #[error("recognition cancelled")]
    Cancelled,
}

/// Capability contract for turning an image into text.
///
/// Implementations must honor the cancellation token promptly: once it trips,
/// return [`ExtractionError::Cancelled`] rather than keep grinding. The
/// session discards late results either way, but a cooperative backend frees
/// its resources sooner.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(
        &self,
        asset: &ImageAsset,
        cancel: &CancellationToken,
    ) -> Result<ExtractedText, ExtractionError>;
}
