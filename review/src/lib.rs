//! # Review Engine
//!
//! This crate ties one manuscript review session together:
//!
//! - **Manifest**: Prepare and load the flat directory of letter images
//! - **Session**: Hold the label given to each image and persist it
//! - **Glyph Core**: Cluster and rank images to speed up labeling
//! - **Font Builder**: Hand reviewed letters to the external font tool
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Review Engine                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Manifest   │  │    Glyph     │  │     Font     │           │
//! │  │              │  │     Core     │  │   Builder    │           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! │         │                │                  ▲                   │
//! │         └────────────────┼──────────────────┘                   │
//! │                          ▼                                      │
//! │                  ┌──────────────┐                               │
//! │                  │    Review    │                               │
//! │                  │   Session    │                               │
//! │                  └──────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use uncial_review::{ClassificationLabel, ClusterScope, ReviewEngine};
//!
//! let engine = ReviewEngine::builder()
//!     .with_review_dir("letters_for_review")
//!     .build()
//!     .await?;
//!
//! let report = engine.cluster(ClusterScope::Unclassified, 30, &cancel).await?;
//! engine.classify_many(&report.clusters[0].members, ClassificationLabel::Alpha).await?;
//! engine.save_labels().await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod label;
pub mod manifest;
pub mod session;

pub use config::ReviewConfig;
pub use engine::{ClusterScope, EngineStats, ReviewEngine, ReviewEngineBuilder};
pub use error::{Result, ReviewError};
pub use label::ClassificationLabel;
pub use manifest::{Manifest, ManifestEntry, prepare_review_set};
pub use session::{LoadSummary, ReviewRecord, ReviewSession};

// Re-export from dependencies for convenience
pub use uncial_font::{FontBuildResult, FontConfig, FontRequest};
pub use uncial_glyphs::{
    CancellationToken, CharacterImage, Cluster, ClusterReport, FeatureVector, SimilarityMatch,
    SimilarityReport, SkippedImage,
};
