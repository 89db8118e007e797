//! Resolution of a [`FontRequest`] into the glyph plan the font tool reads.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::request::FontRequest;
use crate::table::{
    FontMetrics, GREEK_LETTERS, PUNCTUATION, PunctuationShape, glyph_name, lowercase_of,
};

/// Where a letter's outline comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutlineSource {
    /// Traced from a reviewed image.
    Image { image_id: String, path: PathBuf },
    /// No usable image; the tool draws a box.
    Placeholder,
}

/// A Greek capital in the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedGlyph {
    pub label: String,
    pub code_point: u32,
    pub glyph_name: String,
    pub source: OutlineSource,
}

impl PlannedGlyph {
    pub fn is_placeholder(&self) -> bool {
        matches!(self.source, OutlineSource::Placeholder)
    }
}

/// A lowercase code point mapped onto its capital's outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LowercaseReference {
    pub code_point: u32,
    pub glyph_name: String,
    pub base: String,
}

/// A procedurally drawn punctuation mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedPunctuation {
    pub code_point: u32,
    pub glyph_name: String,
    pub shape: PunctuationShape,
}

/// Everything the external tool needs to produce a font.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlyphPlan {
    pub family_name: String,
    pub metrics: FontMetrics,
    pub letters: Vec<PlannedGlyph>,
    pub lowercase: Vec<LowercaseReference>,
    pub punctuation: Vec<PlannedPunctuation>,

    /// Request labels that have no glyph in the font.
    pub ignored_labels: Vec<String>,
}

impl GlyphPlan {
    /// Resolve a request, treating a candidate as usable when its file decodes.
    pub fn resolve(request: &FontRequest, metrics: FontMetrics) -> Self {
        Self::resolve_with(request, metrics, |path| match image::open(path) {
            Ok(_) => true,
            Err(e) => {
                warn!("Skipping glyph candidate {}: {e}", path.display());
                false
            }
        })
    }

    /// Resolve a request with a custom usability check.
    pub fn resolve_with<F>(request: &FontRequest, metrics: FontMetrics, usable: F) -> Self
    where
        F: Fn(&Path) -> bool,
    {
        let mut letters = Vec::with_capacity(GREEK_LETTERS.len());
        let mut lowercase = Vec::new();

        for (label, capital) in GREEK_LETTERS {
            let chosen = request
                .labels
                .get(label)
                .and_then(|candidates| candidates.iter().find(|c| usable(&c.path)));

            let source = match chosen {
                Some(candidate) => OutlineSource::Image {
                    image_id: candidate.id.clone(),
                    path: candidate.path.clone(),
                },
                None => OutlineSource::Placeholder,
            };
            let name = glyph_name(capital);

            if let Some(lower) = lowercase_of(capital) {
                lowercase.push(LowercaseReference {
                    code_point: u32::from(lower),
                    glyph_name: glyph_name(lower),
                    base: name.clone(),
                });
            }

            letters.push(PlannedGlyph {
                label: label.to_string(),
                code_point: u32::from(capital),
                glyph_name: name,
                source,
            });
        }

        let ignored_labels: Vec<String> = request
            .labels
            .keys()
            .filter(|label| !GREEK_LETTERS.iter().any(|(name, _)| name == label))
            .cloned()
            .collect();
        if !ignored_labels.is_empty() {
            debug!("Labels without a font glyph: {ignored_labels:?}");
        }

        let punctuation = PUNCTUATION
            .iter()
            .map(|p| PlannedPunctuation {
                code_point: u32::from(p.code_point),
                glyph_name: p.glyph_name.to_string(),
                shape: p.shape,
            })
            .collect();

        Self {
            family_name: request.family_name.clone(),
            metrics,
            letters,
            lowercase,
            punctuation,
            ignored_labels,
        }
    }

    /// Number of letters traced from images.
    pub fn from_images(&self) -> usize {
        self.letters.iter().filter(|g| !g.is_placeholder()).count()
    }

    /// Number of placeholder letters.
    pub fn placeholders(&self) -> usize {
        self.letters.len() - self.from_images()
    }

    /// Labels of letters that fell back to a placeholder.
    pub fn missing(&self) -> Vec<String> {
        self.letters
            .iter()
            .filter(|g| g.is_placeholder())
            .map(|g| g.label.clone())
            .collect()
    }

    /// Point a letter at a different image file, e.g. a cleaned copy.
    pub fn replace_path(&mut self, label: &str, new_path: PathBuf) -> bool {
        let glyph = self.letters.iter_mut().find(|g| g.label == label);
        match glyph.map(|g| &mut g.source) {
            Some(OutlineSource::Image { path, .. }) => {
                *path = new_path;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::GlyphCandidate;
    use pretty_assertions::assert_eq;

    fn usable_unless_broken(path: &Path) -> bool {
        !path.to_string_lossy().contains("broken")
    }

    #[test]
    fn test_first_usable_candidate_wins() {
        let request = FontRequest::new()
            .with_candidate("ALPHA", GlyphCandidate::new("a0", "broken.png"))
            .with_candidate("ALPHA", GlyphCandidate::new("a1", "a1.png"))
            .with_candidate("ALPHA", GlyphCandidate::new("a2", "a2.png"));

        let plan = GlyphPlan::resolve_with(&request, FontMetrics::default(), usable_unless_broken);

        assert_eq!(
            plan.letters[0].source,
            OutlineSource::Image {
                image_id: "a1".to_string(),
                path: PathBuf::from("a1.png"),
            }
        );
        assert_eq!(plan.from_images(), 1);
        assert_eq!(plan.placeholders(), 23);
    }

    #[test]
    fn test_letters_in_alphabet_order_with_placeholders() {
        let request =
            FontRequest::new().with_candidate("OMEGA", GlyphCandidate::new("w", "broken.png"));
        let plan = GlyphPlan::resolve_with(&request, FontMetrics::default(), usable_unless_broken);

        assert_eq!(plan.letters.len(), 24);
        assert_eq!(plan.letters[0].glyph_name, "uni0391");
        assert_eq!(plan.letters[23].label, "OMEGA");
        assert!(plan.letters[23].is_placeholder());
        assert_eq!(plan.missing().len(), 24);
    }

    #[test]
    fn test_lowercase_references_capitals() {
        let plan = GlyphPlan::resolve_with(&FontRequest::new(), FontMetrics::default(), |_| true);

        assert_eq!(plan.lowercase.len(), 24);
        assert_eq!(plan.lowercase[0].code_point, 0x03B1);
        assert_eq!(plan.lowercase[0].base, "uni0391");
        let sigma = plan
            .lowercase
            .iter()
            .find(|l| l.base == "uni03A3")
            .unwrap();
        assert_eq!(sigma.code_point, 0x03C3);
    }

    #[test]
    fn test_non_letter_labels_are_ignored() {
        let request = FontRequest::new()
            .with_candidate("NON_LETTER", GlyphCandidate::new("n", "n.png"))
            .with_candidate("PERIOD", GlyphCandidate::new("p", "p.png"));
        let plan = GlyphPlan::resolve_with(&request, FontMetrics::default(), |_| true);

        assert_eq!(plan.ignored_labels, vec!["NON_LETTER", "PERIOD"]);
        assert_eq!(plan.punctuation.len(), 7);
        assert_eq!(plan.punctuation[0].code_point, 0x2E);
    }

    #[test]
    fn test_plan_serializes_tagged_sources() {
        let request = FontRequest::new().with_candidate("BETA", GlyphCandidate::new("b", "b.png"));
        let plan = GlyphPlan::resolve_with(&request, FontMetrics::default(), |_| true);
        let json = serde_json::to_value(&plan).unwrap();

        assert_eq!(json["family_name"], "Sinaiticus");
        assert_eq!(json["metrics"]["ascent"], 800);
        assert_eq!(json["letters"][1]["source"]["kind"], "image");
        assert_eq!(json["letters"][0]["source"]["kind"], "placeholder");
        assert_eq!(json["punctuation"][3]["shape"]["base"], "periodcentered");
    }

    #[test]
    fn test_replace_path_only_touches_image_letters() {
        let request = FontRequest::new().with_candidate("PHI", GlyphCandidate::new("f", "f.png"));
        let mut plan = GlyphPlan::resolve_with(&request, FontMetrics::default(), |_| true);

        assert!(plan.replace_path("PHI", PathBuf::from("clean/f.png")));
        assert!(!plan.replace_path("PSI", PathBuf::from("clean/p.png")));
        let phi = plan.letters.iter().find(|g| g.label == "PHI").unwrap();
        assert_eq!(
            phi.source,
            OutlineSource::Image {
                image_id: "f".to_string(),
                path: PathBuf::from("clean/f.png"),
            }
        );
    }
}
