//! # Font Builder
//!
//! Turns reviewed letter images into a TrueType font by way of an external
//! font tool.
//!
//! - **Plan**: choose one usable image per Greek capital, fall back to
//!   placeholders, add lowercase references and punctuation
//! - **Clean**: despeckle letters prone to stray ink
//! - **Build**: write the plan as a JSON job and run the tool with a timeout
//!
//! ```text
//! FontRequest ──► GlyphPlan ──► job.json ──► font tool ──► .ttf
//!                     │
//!                     ▼
//!                 despeckle
//! ```

pub mod builder;
pub mod clean;
pub mod error;
pub mod plan;
pub mod request;
pub mod table;

pub use builder::{FontBuildResult, FontBuilder, FontConfig, output_file_name};
pub use clean::{DespeckleParams, DespeckleStats, despeckle};
pub use error::{FontError, Result};
pub use plan::{GlyphPlan, LowercaseReference, OutlineSource, PlannedGlyph, PlannedPunctuation};
pub use request::{DEFAULT_FAMILY, FontRequest, GlyphCandidate};
pub use table::{FontMetrics, GREEK_LETTERS, PUNCTUATION, glyph_name, greek_letter, lowercase_of};
