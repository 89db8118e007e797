//! Character image records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single cropped character image from a manuscript page.
///
/// Records are immutable once loaded. The glyph core never reads the manifest
/// format itself; callers hand it already-parsed records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterImage {
    /// Stable identifier (e.g. `letter_00042`).
    pub id: String,

    /// Identifier of the page the glyph was cropped from.
    pub source_page: String,

    /// Pixel width as reported by the source.
    pub width: u32,

    /// Pixel height as reported by the source.
    pub height: u32,

    /// Source-provided quality score.
    pub quality: f32,

    /// Location of the image file.
    pub path: PathBuf,
}

impl CharacterImage {
    /// Create a record with the given id and file path.
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            source_page: String::new(),
            width: 0,
            height: 0,
            quality: 0.0,
            path: path.into(),
        }
    }

    /// Set the source page.
    pub fn with_source_page(mut self, page: impl Into<String>) -> Self {
        self.source_page = page.into();
        self
    }

    /// Set the pixel dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the quality score.
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }
}

/// An image that was left out of a batch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedImage {
    /// Identifier of the skipped image.
    pub id: String,

    /// Why it was skipped.
    pub reason: String,
}
