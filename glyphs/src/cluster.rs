//! Coarse grouping of character images for review.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cache::{CacheEntries, CacheKey};
use crate::error::{GlyphError, Result};
use crate::extract::{CachePolicy, DEFAULT_CLUSTER_GRID, FeatureExtractor, validate_grid};
use crate::kmeans::kmeans;
use crate::record::{CharacterImage, SkippedImage};
use crate::vector::FeatureVector;

/// Default cap on k-means passes.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Configuration for clustering runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Grid resolution vectors are extracted at.
    pub grid: u32,

    /// Maximum number of assignment passes.
    pub max_iterations: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            grid: DEFAULT_CLUSTER_GRID,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// One group of visually similar images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster label in `0..k`.
    pub label: usize,

    /// Member image ids, in input order.
    pub members: Vec<String>,

    /// Mean vector of the members.
    pub centroid: FeatureVector,
}

/// Result of a clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    /// Clusters indexed by label. Some may be empty.
    pub clusters: Vec<Cluster>,

    /// Images left out because they could not be read.
    pub skipped: Vec<SkippedImage>,

    /// The `k` the caller asked for.
    pub requested_k: usize,

    /// The `k` actually used after clamping to the readable image count.
    pub k: usize,

    /// Grid resolution used.
    pub grid: u32,

    /// Assignment passes performed.
    pub iterations: usize,

    /// Whether assignments stabilized before the iteration cap.
    pub converged: bool,
}

impl ClusterReport {
    /// Number of images that were skipped.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Total number of clustered images.
    pub fn member_count(&self) -> usize {
        self.clusters.iter().map(|c| c.members.len()).sum()
    }

    /// Cluster label → member ids.
    pub fn assignments(&self) -> BTreeMap<usize, Vec<String>> {
        self.clusters
            .iter()
            .map(|c| (c.label, c.members.clone()))
            .collect()
    }

    /// Label of the cluster containing `image_id`.
    pub fn cluster_of(&self, image_id: &str) -> Option<usize> {
        self.clusters
            .iter()
            .find(|c| c.members.iter().any(|m| m == image_id))
            .map(|c| c.label)
    }
}

/// Groups images with k-means over their grid features.
pub struct ClusterEngine {
    extractor: Arc<FeatureExtractor>,
    config: ClusterConfig,
}

impl ClusterEngine {
    /// Create an engine with default configuration.
    pub fn new(extractor: Arc<FeatureExtractor>) -> Self {
        Self::with_config(extractor, ClusterConfig::default())
    }

    /// Create an engine with the given configuration.
    pub fn with_config(extractor: Arc<FeatureExtractor>, config: ClusterConfig) -> Self {
        Self { extractor, config }
    }

    /// The engine configuration.
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Partition `images` into at most `k` clusters.
    ///
    /// Every vector is extracted fresh for the run. When the run completes,
    /// the shared cache is replaced by exactly the vectors of this run; a
    /// cancelled or failed run leaves the cache as it was.
    pub fn cluster(
        &self,
        images: &[CharacterImage],
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<ClusterReport> {
        if k == 0 {
            return Err(GlyphError::InvalidParameter(
                "k must be at least 1".to_string(),
            ));
        }
        let grid = self.config.grid;
        validate_grid(grid)?;
        if self.config.max_iterations == 0 {
            return Err(GlyphError::InvalidParameter(
                "max_iterations must be positive".to_string(),
            ));
        }

        info!(
            "Clustering {} images into k={k} at grid {grid}",
            images.len()
        );

        let batch = self
            .extractor
            .extract_batch(images, grid, CachePolicy::Fresh, cancel)?;

        let effective_k = k.min(batch.vectors.len());
        let (clusters, iterations, converged) = if effective_k == 0 {
            (Vec::new(), 0, true)
        } else {
            let refs: Vec<&[f32]> = batch.vectors.iter().map(|v| v.vector.as_slice()).collect();
            let outcome = kmeans(&refs, effective_k, self.config.max_iterations, cancel)?;

            let mut members: Vec<Vec<String>> = vec![Vec::new(); effective_k];
            for (extracted, &label) in batch.vectors.iter().zip(&outcome.assignments) {
                members[label].push(images[extracted.index].id.clone());
            }

            let clusters = members
                .into_iter()
                .zip(outcome.centroids)
                .enumerate()
                .map(|(label, (members, centroid))| {
                    Ok(Cluster {
                        label,
                        members,
                        centroid: FeatureVector::new(grid, centroid)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            (clusters, outcome.iterations, outcome.converged)
        };

        if cancel.is_cancelled() {
            return Err(GlyphError::Cancelled);
        }

        let entries: CacheEntries = batch
            .vectors
            .iter()
            .map(|v| {
                (
                    CacheKey::new(images[v.index].id.as_str(), grid),
                    Arc::clone(&v.vector),
                )
            })
            .collect();
        self.extractor.cache().replace(entries);

        info!(
            "Clustered {} images into {} groups in {iterations} passes (converged: {converged}, skipped: {})",
            batch.vectors.len(),
            clusters.len(),
            batch.skipped.len()
        );

        Ok(ClusterReport {
            clusters,
            skipped: batch.skipped,
            requested_k: k,
            k: effective_k,
            grid,
            iterations,
            converged,
        })
    }
}
