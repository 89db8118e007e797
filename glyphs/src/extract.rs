//! Grid-binned intensity features for character images.

use std::sync::Arc;

use image::GrayImage;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{CacheKey, FeatureCache};
use crate::error::{GlyphError, Result};
use crate::record::{CharacterImage, SkippedImage};
use crate::source::GlyphSource;
use crate::vector::FeatureVector;

/// Grid resolution used for clustering.
pub const DEFAULT_CLUSTER_GRID: u32 = 16;

/// Grid resolution used for similarity search.
pub const DEFAULT_SIMILARITY_GRID: u32 = 32;

/// Largest accepted grid resolution.
pub const MAX_GRID: u32 = 1024;

/// Reject grid resolutions outside `1..=MAX_GRID`.
pub fn validate_grid(grid: u32) -> Result<()> {
    if grid == 0 {
        return Err(GlyphError::InvalidParameter(
            "grid resolution must be positive".to_string(),
        ));
    }
    if grid > MAX_GRID {
        return Err(GlyphError::InvalidParameter(format!(
            "grid resolution {grid} exceeds {MAX_GRID}"
        )));
    }
    Ok(())
}

/// Bin a grayscale bitmap into `grid x grid` cells of inverted mean intensity.
///
/// Dark ink maps to values near 1 and paper to values near 0, so distances
/// are driven by glyph shape rather than by the amount of blank background.
/// Images smaller than the grid reuse pixels: every cell covers at least one.
pub fn grid_features(bitmap: &GrayImage, grid: u32) -> Result<FeatureVector> {
    validate_grid(grid)?;
    let (width, height) = bitmap.dimensions();
    if width == 0 || height == 0 {
        return Err(GlyphError::InvalidParameter(
            "cannot extract features from an empty image".to_string(),
        ));
    }

    let columns = cell_spans(width, grid);
    let rows = cell_spans(height, grid);
    let mut values = Vec::with_capacity((grid as usize) * (grid as usize));

    for &(y0, y1) in &rows {
        for &(x0, x1) in &columns {
            let mut sum = 0u64;
            for y in y0..y1 {
                for x in x0..x1 {
                    sum += u64::from(bitmap.get_pixel(x, y)[0]);
                }
            }
            let count = u64::from(y1 - y0) * u64::from(x1 - x0);
            let brightness = sum as f64 / (count as f64 * 255.0);
            values.push((1.0 - brightness).clamp(0.0, 1.0) as f32);
        }
    }

    FeatureVector::new(grid, values)
}

/// Pixel ranges `[start, end)` covered by each of `grid` cells along one axis.
fn cell_spans(length: u32, grid: u32) -> Vec<(u32, u32)> {
    let length64 = u64::from(length);
    let grid64 = u64::from(grid);
    (0..grid64)
        .map(|cell| {
            let start = (cell * length64 / grid64) as u32;
            let end = ((cell + 1) * length64 / grid64) as u32;
            (start, end.max(start + 1).min(length))
        })
        .collect()
}

/// How a batch extraction interacts with the shared cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Read cached vectors and store new ones.
    Shared,
    /// Recompute everything and leave the cache untouched.
    Fresh,
}

/// A vector extracted from the input at position `index`.
#[derive(Debug, Clone)]
pub struct ExtractedVector {
    /// Position of the image in the batch input.
    pub index: usize,

    /// The vector.
    pub vector: Arc<FeatureVector>,
}

/// Outcome of extracting a batch of images.
#[derive(Debug, Clone, Default)]
pub struct BatchExtraction {
    /// Vectors for every readable image, in input order.
    pub vectors: Vec<ExtractedVector>,

    /// Images that could not be read.
    pub skipped: Vec<SkippedImage>,
}

/// Extracts feature vectors through a shared cache.
pub struct FeatureExtractor {
    source: Arc<dyn GlyphSource>,
    cache: Arc<FeatureCache>,
}

impl FeatureExtractor {
    /// Create an extractor with its own empty cache.
    pub fn new(source: Arc<dyn GlyphSource>) -> Self {
        Self::with_cache(source, Arc::new(FeatureCache::new()))
    }

    /// Create an extractor around an existing cache.
    pub fn with_cache(source: Arc<dyn GlyphSource>, cache: Arc<FeatureCache>) -> Self {
        Self { source, cache }
    }

    /// The shared cache.
    pub fn cache(&self) -> &Arc<FeatureCache> {
        &self.cache
    }

    /// Extract the vector for `image`, using the cache when possible.
    pub fn extract(&self, image: &CharacterImage, grid: u32) -> Result<Arc<FeatureVector>> {
        validate_grid(grid)?;

        if let Some(vector) = self.cache.get(&image.id, grid) {
            return Ok(vector);
        }

        let generation = self.cache.generation();
        let vector = Arc::new(self.compute(image, grid)?);
        self.cache.insert(
            generation,
            CacheKey::new(image.id.as_str(), grid),
            Arc::clone(&vector),
        );
        Ok(vector)
    }

    /// Extract without consulting or populating the cache.
    pub fn compute(&self, image: &CharacterImage, grid: u32) -> Result<FeatureVector> {
        let bitmap = self.source.load(image)?;
        if bitmap.width() == 0 || bitmap.height() == 0 {
            return Err(GlyphError::unavailable(&image.id, "image has no pixels"));
        }
        debug!(
            "Extracting {grid}x{grid} features for {} via {}",
            image.id,
            self.source.name()
        );
        grid_features(&bitmap, grid)
    }

    /// Extract a batch in parallel.
    ///
    /// Unreadable images are skipped and reported. Output order follows the
    /// input regardless of scheduling. Cancellation is checked per image and
    /// returns [`GlyphError::Cancelled`] without a partial result.
    pub fn extract_batch(
        &self,
        images: &[CharacterImage],
        grid: u32,
        policy: CachePolicy,
        cancel: &CancellationToken,
    ) -> Result<BatchExtraction> {
        validate_grid(grid)?;
        if cancel.is_cancelled() {
            return Err(GlyphError::Cancelled);
        }

        let outcomes: Vec<Result<Arc<FeatureVector>>> = images
            .par_iter()
            .map(|image| {
                if cancel.is_cancelled() {
                    return Err(GlyphError::Cancelled);
                }
                match policy {
                    CachePolicy::Shared => self.extract(image, grid),
                    CachePolicy::Fresh => self.compute(image, grid).map(Arc::new),
                }
            })
            .collect();

        if cancel.is_cancelled() {
            return Err(GlyphError::Cancelled);
        }

        let mut batch = BatchExtraction::default();
        for (index, (image, outcome)) in images.iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(vector) => batch.vectors.push(ExtractedVector { index, vector }),
                Err(e) if e.is_per_item() => {
                    warn!("Skipping {}: {e}", image.id);
                    batch.skipped.push(SkippedImage {
                        id: image.id.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            "Extracted {} vectors at grid {grid}, skipped {}",
            batch.vectors.len(),
            batch.skipped.len()
        );
        Ok(batch)
    }
}
