//! # Glyphs
//!
//! Feature extraction, clustering and similarity search over cropped
//! manuscript character images.
//!
//! ## Features
//!
//! - **Feature Extraction**: Bin a glyph into a grid of ink densities
//! - **Clustering**: Group visually similar glyphs with k-means
//! - **Similarity Search**: Rank glyphs by distance to a reference
//! - **Caching**: Share extracted vectors between queries
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Glyph Core                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  GlyphSource ──► FeatureExtractor ──► FeatureVector             │
//! │                        │                    │                   │
//! │                        ▼                    ▼                   │
//! │                  FeatureCache     ClusterEngine / SimilarityEngine
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod cluster;
pub mod error;
pub mod extract;
pub mod kmeans;
pub mod record;
pub mod similarity;
pub mod source;
pub mod vector;

pub use cache::{CacheStats, FeatureCache};
pub use cluster::{Cluster, ClusterConfig, ClusterEngine, ClusterReport};
pub use error::{GlyphError, Result};
pub use extract::{
    BatchExtraction, CachePolicy, DEFAULT_CLUSTER_GRID, DEFAULT_SIMILARITY_GRID, FeatureExtractor,
    MAX_GRID, grid_features, validate_grid,
};
pub use record::{CharacterImage, SkippedImage};
pub use similarity::{SimilarityConfig, SimilarityEngine, SimilarityMatch, SimilarityReport};
pub use source::{FileGlyphSource, GlyphSource, MemoryGlyphSource};
pub use vector::{FeatureVector, euclidean_distance};

/// Re-exported so callers can cancel long passes without a direct dependency.
pub use tokio_util::sync::CancellationToken;
