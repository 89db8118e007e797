//! Error types for review sessions.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for review operations.
pub type Result<T> = std::result::Result<T, ReviewError>;

/// Errors that can occur while reviewing glyphs.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// Feature extraction, clustering or similarity error.
    #[error("glyph error: {0}")]
    Glyph(#[from] uncial_glyphs::GlyphError),

    /// Font build error.
    #[error("font error: {0}")]
    Font(#[from] uncial_font::FontError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Manifest could not be read or prepared.
    #[error("manifest error at {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    /// No image with this id in the session.
    #[error("unknown image: {0}")]
    UnknownImage(String),

    /// Not a classification label.
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    /// A blocking task panicked or was aborted.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReviewError {
    pub(crate) fn manifest(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Manifest {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error is a cancelled long-running pass.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Glyph(uncial_glyphs::GlyphError::Cancelled))
    }
}
