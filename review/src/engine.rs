//! Review engine implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uncial_font::{FontBuildResult, FontBuilder, FontConfig};
use uncial_glyphs::{
    CacheStats, CancellationToken, CharacterImage, ClusterEngine, ClusterReport, FeatureExtractor,
    FileGlyphSource, GlyphSource, SimilarityEngine, SimilarityReport,
};

use crate::config::ReviewConfig;
use crate::error::{Result, ReviewError};
use crate::label::ClassificationLabel;
use crate::manifest::Manifest;
use crate::session::{LoadSummary, ReviewSession};

/// Which images a clustering pass covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterScope {
    /// Every image in the session.
    #[default]
    All,
    /// Only images without a label.
    Unclassified,
}

/// Review engine tying the session to the glyph core and the font builder.
///
/// The engine coordinates:
/// - Classification state for one review session
/// - Clustering and similarity passes over a shared feature cache
/// - Saving labels and building fonts from them
pub struct ReviewEngine {
    config: ReviewConfig,
    session: Arc<RwLock<ReviewSession>>,
    extractor: Arc<FeatureExtractor>,
    clusterer: Arc<ClusterEngine>,
    similarity: Arc<SimilarityEngine>,
    font: FontBuilder,
}

impl ReviewEngine {
    /// Create a new review engine builder.
    pub fn builder() -> ReviewEngineBuilder {
        ReviewEngineBuilder::new()
    }

    /// Load the manifest named by `config` and read images from disk.
    pub async fn new(config: ReviewConfig) -> Result<Self> {
        config.validate()?;
        let manifest = Manifest::load(config.manifest_path()).await?;
        let images = manifest.to_images(&config.review_dir);
        Ok(Self::from_parts(config, images, Arc::new(FileGlyphSource::new())))
    }

    /// Assemble an engine from already loaded images.
    pub fn from_parts(
        config: ReviewConfig,
        images: Vec<CharacterImage>,
        source: Arc<dyn GlyphSource>,
    ) -> Self {
        info!(
            "Starting review of {} images with {} source",
            images.len(),
            source.name()
        );
        let extractor = Arc::new(FeatureExtractor::new(source));
        let clusterer = Arc::new(ClusterEngine::with_config(
            Arc::clone(&extractor),
            config.cluster.clone(),
        ));
        let similarity = Arc::new(SimilarityEngine::with_config(
            Arc::clone(&extractor),
            config.similarity.clone(),
        ));
        let font = FontBuilder::new(config.font.clone());

        Self {
            config,
            session: Arc::new(RwLock::new(ReviewSession::new(images))),
            extractor,
            clusterer,
            similarity,
            font,
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Shared handle to the session.
    pub fn session(&self) -> Arc<RwLock<ReviewSession>> {
        Arc::clone(&self.session)
    }

    /// The shared feature extractor.
    pub fn extractor(&self) -> &Arc<FeatureExtractor> {
        &self.extractor
    }

    /// Run k-means over the images in `scope`.
    pub async fn cluster(
        &self,
        scope: ClusterScope,
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<ClusterReport> {
        let images: Vec<CharacterImage> = {
            let session = self.session.read().await;
            match scope {
                ClusterScope::All => session.images().cloned().collect(),
                ClusterScope::Unclassified => {
                    session.unclassified().into_iter().cloned().collect()
                }
            }
        };
        debug!("Clustering {} images ({scope:?})", images.len());

        let clusterer = Arc::clone(&self.clusterer);
        let cancel = cancel.clone();
        let report =
            tokio::task::spawn_blocking(move || clusterer.cluster(&images, k, &cancel)).await??;
        Ok(report)
    }

    /// Rank every session image by similarity to `reference_id`.
    pub async fn find_similar(
        &self,
        reference_id: &str,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<SimilarityReport> {
        let (reference, candidates) = {
            let session = self.session.read().await;
            let reference = session
                .image(reference_id)
                .cloned()
                .ok_or_else(|| ReviewError::UnknownImage(reference_id.to_string()))?;
            let candidates: Vec<CharacterImage> = session.images().cloned().collect();
            (reference, candidates)
        };

        let similarity = Arc::clone(&self.similarity);
        let grid = self.config.similarity.grid;
        let limit = limit.unwrap_or(self.config.similarity.limit);
        let cancel = cancel.clone();
        let report = tokio::task::spawn_blocking(move || {
            similarity.find_similar(&reference, &candidates, grid, limit, &cancel)
        })
        .await??;
        Ok(report)
    }

    /// Label one image.
    pub async fn classify(
        &self,
        id: &str,
        label: ClassificationLabel,
    ) -> Result<Option<ClassificationLabel>> {
        self.session.write().await.classify(id, label)
    }

    /// Label several images at once. Nothing changes if any id is unknown.
    pub async fn classify_many(&self, ids: &[String], label: ClassificationLabel) -> Result<usize> {
        let mut session = self.session.write().await;
        if let Some(unknown) = ids.iter().find(|id| session.image(id).is_none()) {
            return Err(ReviewError::UnknownImage(unknown.clone()));
        }
        for id in ids {
            session.classify(id, label)?;
        }
        debug!("Classified {} images as {label}", ids.len());
        Ok(ids.len())
    }

    /// Apply the saved labels file, if there is one.
    pub async fn load_labels(&self) -> Result<LoadSummary> {
        let path = self.config.labels_path();
        if !tokio::fs::try_exists(&path).await? {
            debug!("No saved labels at {}", path.display());
            return Ok(LoadSummary::default());
        }
        self.session.write().await.load_records(&path).await
    }

    /// Write the session's labels to the configured labels file.
    pub async fn save_labels(&self) -> Result<PathBuf> {
        let path = self.config.labels_path();
        self.session.read().await.save(&path).await?;
        Ok(path)
    }

    /// Build a font from the Greek letter classifications.
    pub async fn build_font(&self) -> Result<FontBuildResult> {
        let request = self.session.read().await.font_request();
        info!(
            "Building font from {} classified letters",
            request.candidate_count()
        );
        Ok(self.font.build(&request).await?)
    }

    /// Get engine statistics.
    pub async fn stats(&self) -> EngineStats {
        let session = self.session.read().await;
        EngineStats {
            images: session.len(),
            classified: session.classified_count(),
            unclassified: session.len() - session.classified_count(),
            labels: session.counts(),
            cache: self.extractor.cache().stats(),
        }
    }
}

/// Builder for review engines.
pub struct ReviewEngineBuilder {
    config: ReviewConfig,
    images: Option<Vec<CharacterImage>>,
    source: Option<Arc<dyn GlyphSource>>,
}

impl ReviewEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: ReviewConfig::default(),
            images: None,
            source: None,
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: ReviewConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the review directory.
    pub fn with_review_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.review_dir = dir.into();
        self
    }

    /// Use these images instead of loading the manifest.
    pub fn with_images(mut self, images: Vec<CharacterImage>) -> Self {
        self.images = Some(images);
        self
    }

    /// Read pixels from `source` instead of the file system.
    pub fn with_source(mut self, source: Arc<dyn GlyphSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the clustering grid.
    pub fn with_cluster_grid(mut self, grid: u32) -> Self {
        self.config.cluster.grid = grid;
        self
    }

    /// Set the similarity grid.
    pub fn with_similarity_grid(mut self, grid: u32) -> Self {
        self.config.similarity.grid = grid;
        self
    }

    /// Set the default number of similarity matches.
    pub fn with_similarity_limit(mut self, limit: usize) -> Self {
        self.config.similarity.limit = limit;
        self
    }

    /// Set the font build configuration.
    pub fn with_font(mut self, config: FontConfig) -> Self {
        self.config.font = config;
        self
    }

    /// Build the engine.
    pub async fn build(self) -> Result<ReviewEngine> {
        self.config.validate()?;
        let images = match self.images {
            Some(images) => images,
            None => Manifest::load(self.config.manifest_path())
                .await?
                .to_images(&self.config.review_dir),
        };
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(FileGlyphSource::new()));
        Ok(ReviewEngine::from_parts(self.config, images, source))
    }
}

impl Default for ReviewEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about a review session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Number of images under review.
    pub images: usize,

    /// Number of images with a label.
    pub classified: usize,

    /// Number of images without a label.
    pub unclassified: usize,

    /// Images per label.
    pub labels: BTreeMap<ClassificationLabel, usize>,

    /// Feature cache counters.
    pub cache: CacheStats,
}
