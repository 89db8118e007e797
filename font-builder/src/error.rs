//! Error types for font building.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for font operations.
pub type Result<T> = std::result::Result<T, FontError>;

/// Errors that can occur while planning or building a font.
#[derive(Error, Debug)]
pub enum FontError {
    /// The request or configuration cannot produce a font.
    #[error("invalid font request: {0}")]
    InvalidRequest(String),

    /// The external font tool could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An image could not be cleaned.
    #[error("image error for {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
