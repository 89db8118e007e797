//! Pixel sources for character images.
//!
//! The extractor never opens files directly; it asks a [`GlyphSource`] for a
//! grayscale bitmap. This keeps decoding in one place and lets callers that
//! already hold pixels skip the filesystem.

use std::collections::HashMap;
use std::path::PathBuf;

use image::GrayImage;
use tracing::debug;

use crate::error::{GlyphError, Result};
use crate::record::CharacterImage;

/// Trait for anything that can produce grayscale pixels for a character image.
pub trait GlyphSource: Send + Sync {
    /// Get the name of this source, for logging.
    fn name(&self) -> &str;

    /// Load the image as 8-bit grayscale.
    ///
    /// Fails with [`GlyphError::ImageUnavailable`] when the image cannot be
    /// read or decoded.
    fn load(&self, image: &CharacterImage) -> Result<GrayImage>;
}

/// Reads image files from disk, optionally relative to a root directory.
#[derive(Debug, Clone, Default)]
pub struct FileGlyphSource {
    root: Option<PathBuf>,
}

impl FileGlyphSource {
    /// Create a source that uses image paths as given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative image paths against `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn resolve(&self, image: &CharacterImage) -> PathBuf {
        match &self.root {
            Some(root) if image.path.is_relative() => root.join(&image.path),
            _ => image.path.clone(),
        }
    }
}

impl GlyphSource for FileGlyphSource {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self, image: &CharacterImage) -> Result<GrayImage> {
        let path = self.resolve(image);
        debug!("Decoding {} from {}", image.id, path.display());
        let decoded = image::open(&path).map_err(|e| GlyphError::unavailable(&image.id, e))?;
        Ok(decoded.to_luma8())
    }
}

/// Holds decoded bitmaps in memory, keyed by image id.
#[derive(Debug, Clone, Default)]
pub struct MemoryGlyphSource {
    bitmaps: HashMap<String, GrayImage>,
}

impl MemoryGlyphSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bitmap for an image id.
    pub fn insert(&mut self, id: impl Into<String>, bitmap: GrayImage) {
        self.bitmaps.insert(id.into(), bitmap);
    }

    /// Builder-style variant of [`MemoryGlyphSource::insert`].
    pub fn with(mut self, id: impl Into<String>, bitmap: GrayImage) -> Self {
        self.insert(id, bitmap);
        self
    }

    /// Number of registered bitmaps.
    pub fn len(&self) -> usize {
        self.bitmaps.len()
    }

    /// Whether no bitmaps are registered.
    pub fn is_empty(&self) -> bool {
        self.bitmaps.is_empty()
    }
}

impl GlyphSource for MemoryGlyphSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, image: &CharacterImage) -> Result<GrayImage> {
        self.bitmaps
            .get(&image.id)
            .cloned()
            .ok_or_else(|| GlyphError::unavailable(&image.id, "no bitmap registered"))
    }
}
