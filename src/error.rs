//! Pipeline error taxonomy
//!
//! Every error here is terminal for the current scan attempt. "No match
//! found" is not an error anywhere in the pipeline; an empty result list is a
//! valid outcome surfaced through the normal presenting path.

use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::store::StoreError;

/// Errors that can end a scan attempt.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The acquired image contained no data.
    #[error("empty image input")]
    EmptyInput,

    /// The acquired image is not in a supported raster format.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The acquired image exceeds the configured byte limit.
    #[error("image too large: {size} bytes (limit {limit})")]
    OversizedInput { size: usize, limit: usize },

    /// The text extraction backend failed.
    #[error("text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// The reference question store could not be reached.
    #[error("question store unavailable: {0}")]
    MatcherUnavailable(#[from] StoreError),
}

impl ScanError {
    /// Whether the caller may sensibly retry this attempt automatically.
    ///
    /// Only extraction timeouts qualify; everything else needs user action
    /// (a new image, a reachable store).
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScanError::Extraction(ExtractionError::Timeout))
    }
}
