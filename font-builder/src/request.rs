//! Input handed to the font builder by a review session.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Family name used when a request does not set one.
pub const DEFAULT_FAMILY: &str = "Sinaiticus";

/// One image that may become the outline of a glyph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphCandidate {
    /// Image identifier, e.g. `letter_00042`.
    pub id: String,

    /// Path to the image file.
    pub path: PathBuf,
}

impl GlyphCandidate {
    /// Create a new candidate.
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }
}

/// Label name to ordered candidates, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontRequest {
    /// Font family name.
    #[serde(default = "default_family")]
    pub family_name: String,

    /// Candidates per label, in preference order.
    #[serde(default)]
    pub labels: BTreeMap<String, Vec<GlyphCandidate>>,
}

fn default_family() -> String {
    DEFAULT_FAMILY.to_string()
}

impl Default for FontRequest {
    fn default() -> Self {
        Self {
            family_name: default_family(),
            labels: BTreeMap::new(),
        }
    }
}

impl FontRequest {
    /// Create an empty request with the default family name.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the family name.
    pub fn with_family(mut self, name: impl Into<String>) -> Self {
        self.family_name = name.into();
        self
    }

    /// Append a candidate for `label`.
    pub fn push(&mut self, label: impl Into<String>, candidate: GlyphCandidate) {
        self.labels.entry(label.into()).or_default().push(candidate);
    }

    /// Builder form of [`FontRequest::push`].
    pub fn with_candidate(mut self, label: impl Into<String>, candidate: GlyphCandidate) -> Self {
        self.push(label, candidate);
        self
    }

    /// Total number of candidates across labels.
    pub fn candidate_count(&self) -> usize {
        self.labels.values().map(Vec::len).sum()
    }
}
