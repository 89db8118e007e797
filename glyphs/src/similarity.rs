//! "Find similar" ranking of character images.

use std::sync::Arc;

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{GlyphError, Result};
use crate::extract::{CachePolicy, DEFAULT_SIMILARITY_GRID, FeatureExtractor, validate_grid};
use crate::record::{CharacterImage, SkippedImage};

/// Default number of ranked matches returned.
pub const DEFAULT_LIMIT: usize = 200;

/// Configuration for similarity queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Grid resolution vectors are extracted at.
    pub grid: u32,

    /// Maximum number of matches.
    pub limit: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            grid: DEFAULT_SIMILARITY_GRID,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// A ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    /// ID of the matched image.
    pub image_id: String,

    /// Euclidean distance to the reference.
    pub distance: f32,
}

impl SimilarityMatch {
    /// Create a new match.
    pub fn new(image_id: impl Into<String>, distance: f32) -> Self {
        Self {
            image_id: image_id.into(),
            distance,
        }
    }
}

/// Result of a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityReport {
    /// The reference image.
    pub reference_id: String,

    /// Grid resolution used.
    pub grid: u32,

    /// Matches sorted by ascending distance.
    pub matches: Vec<SimilarityMatch>,

    /// Candidates left out because they could not be read.
    pub skipped: Vec<SkippedImage>,
}

impl SimilarityReport {
    /// Number of candidates that were skipped.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Matched ids in rank order.
    pub fn ids(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.image_id.as_str()).collect()
    }
}

/// Ranks candidates by distance to a reference image.
pub struct SimilarityEngine {
    extractor: Arc<FeatureExtractor>,
    config: SimilarityConfig,
}

impl SimilarityEngine {
    /// Create an engine with default configuration.
    pub fn new(extractor: Arc<FeatureExtractor>) -> Self {
        Self::with_config(extractor, SimilarityConfig::default())
    }

    /// Create an engine with the given configuration.
    pub fn with_config(extractor: Arc<FeatureExtractor>, config: SimilarityConfig) -> Self {
        Self { extractor, config }
    }

    /// The engine configuration.
    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Rank `candidates` using the configured grid and limit.
    pub fn search(
        &self,
        reference: &CharacterImage,
        candidates: &[CharacterImage],
        cancel: &CancellationToken,
    ) -> Result<SimilarityReport> {
        self.find_similar(
            reference,
            candidates,
            self.config.grid,
            self.config.limit,
            cancel,
        )
    }

    /// Rank `candidates` by euclidean distance to `reference`.
    ///
    /// Equal distances keep input order, except that the reference itself
    /// always ranks ahead of other zero-distance candidates. Unreadable
    /// candidates are skipped; an unreadable reference fails the query.
    pub fn find_similar(
        &self,
        reference: &CharacterImage,
        candidates: &[CharacterImage],
        grid: u32,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<SimilarityReport> {
        validate_grid(grid)?;
        if limit == 0 {
            return Err(GlyphError::InvalidParameter(
                "limit must be at least 1".to_string(),
            ));
        }

        debug!(
            "Finding up to {limit} images similar to {} among {} candidates",
            reference.id,
            candidates.len()
        );

        let query = self.extractor.extract(reference, grid)?;
        let batch = self
            .extractor
            .extract_batch(candidates, grid, CachePolicy::Shared, cancel)?;

        let mut scored = batch
            .vectors
            .par_iter()
            .map(|v| {
                let distance = query.distance(&v.vector)?;
                Ok((v.index, distance))
            })
            .collect::<Result<Vec<(usize, f32)>>>()?;

        if cancel.is_cancelled() {
            return Err(GlyphError::Cancelled);
        }

        scored.sort_by_key(|&(index, distance)| {
            (OrderedFloat(distance), candidates[index].id != reference.id)
        });
        scored.truncate(limit);

        let matches: Vec<SimilarityMatch> = scored
            .into_iter()
            .map(|(index, distance)| SimilarityMatch::new(candidates[index].id.clone(), distance))
            .collect();

        info!(
            "Ranked {} matches for {} (skipped {})",
            matches.len(),
            reference.id,
            batch.skipped.len()
        );

        Ok(SimilarityReport {
            reference_id: reference.id.clone(),
            grid,
            matches,
            skipped: batch.skipped,
        })
    }
}
