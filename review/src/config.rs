//! Configuration for review sessions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uncial_font::FontConfig;
use uncial_glyphs::{ClusterConfig, MAX_GRID, SimilarityConfig};

use crate::error::{Result, ReviewError};

/// Configuration for a review engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Directory holding the prepared letter images and manifest.
    pub review_dir: PathBuf,

    /// Manifest file name, relative to `review_dir`.
    pub manifest_file: PathBuf,

    /// Saved classifications, relative to `review_dir`.
    pub labels_file: PathBuf,

    /// Clustering configuration.
    pub cluster: ClusterConfig,

    /// Similarity search configuration.
    pub similarity: SimilarityConfig,

    /// Font build configuration.
    pub font: FontConfig,
}

impl ReviewConfig {
    /// Create a new configuration with default values.
    pub fn new(review_dir: impl Into<PathBuf>) -> Self {
        Self {
            review_dir: review_dir.into(),
            manifest_file: PathBuf::from("manifest.json"),
            labels_file: PathBuf::from("classifications.json"),
            cluster: ClusterConfig::default(),
            similarity: SimilarityConfig::default(),
            font: FontConfig::default(),
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ReviewError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&text)
    }

    /// Reject values no pass can run with.
    pub fn validate(&self) -> Result<()> {
        for grid in [self.cluster.grid, self.similarity.grid] {
            if grid == 0 || grid > MAX_GRID {
                return Err(ReviewError::Config(format!(
                    "grid must be between 1 and {MAX_GRID}, got {grid}"
                )));
            }
        }
        if self.similarity.limit == 0 {
            return Err(ReviewError::Config(
                "similarity limit must be at least 1".to_string(),
            ));
        }
        if self.font.timeout_secs == 0 {
            return Err(ReviewError::Config(
                "font timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the cluster configuration.
    pub fn with_cluster(mut self, config: ClusterConfig) -> Self {
        self.cluster = config;
        self
    }

    /// Set the similarity configuration.
    pub fn with_similarity(mut self, config: SimilarityConfig) -> Self {
        self.similarity = config;
        self
    }

    /// Set the font configuration.
    pub fn with_font(mut self, config: FontConfig) -> Self {
        self.font = config;
        self
    }

    /// Full path of the manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.review_dir.join(&self.manifest_file)
    }

    /// Full path of the saved classifications.
    pub fn labels_path(&self) -> PathBuf {
        self.review_dir.join(&self.labels_file)
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self::new("review_letters")
    }
}
