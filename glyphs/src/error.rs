//! Error types for glyph feature extraction, clustering and search.

use thiserror::Error;

/// Result type alias for glyph operations.
pub type Result<T> = std::result::Result<T, GlyphError>;

/// Errors that can occur while extracting, clustering or ranking glyphs.
#[derive(Error, Debug)]
pub enum GlyphError {
    /// The image file is missing or could not be decoded.
    #[error("image unavailable: {id}: {reason}")]
    ImageUnavailable { id: String, reason: String },

    /// A parameter was rejected before any work started.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// Vectors extracted at different grid resolutions were compared.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl GlyphError {
    /// Build an [`GlyphError::ImageUnavailable`] for the given image id.
    pub fn unavailable(id: impl Into<String>, reason: impl ToString) -> Self {
        Self::ImageUnavailable {
            id: id.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error concerns a single image rather than the whole pass.
    pub fn is_per_item(&self) -> bool {
        matches!(self, Self::ImageUnavailable { .. })
    }
}
