//! Session-scoped classification state.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uncial_font::{FontRequest, GlyphCandidate};
use uncial_glyphs::CharacterImage;

use crate::error::{Result, ReviewError};
use crate::label::ClassificationLabel;

/// One saved classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: String,
    pub path: PathBuf,

    /// Label name as written, e.g. `ALPHA`.
    ///
    /// Kept as text so one label this build does not know leaves the rest
    /// of the file readable.
    pub classification: String,

    /// Source page of the image.
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub quality: f32,
}

/// Outcome of applying saved records to a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub applied: usize,

    /// Records naming images this session does not hold.
    pub unknown: usize,

    /// Records whose label is not a classification label.
    #[serde(default)]
    pub unknown_labels: usize,
}

/// The images under review and the labels given to them.
///
/// An image holds at most one label. Members of a label are kept in the
/// order they were classified.
#[derive(Debug, Clone, Default)]
pub struct ReviewSession {
    images: IndexMap<String, CharacterImage>,
    members: BTreeMap<ClassificationLabel, IndexSet<String>>,
    assigned: HashMap<String, ClassificationLabel>,
}

impl ReviewSession {
    /// Create a session over `images`, in manifest order.
    pub fn new(images: Vec<CharacterImage>) -> Self {
        let images = images
            .into_iter()
            .map(|image| (image.id.clone(), image))
            .collect();
        Self {
            images,
            ..Self::default()
        }
    }

    /// All images, in manifest order.
    pub fn images(&self) -> impl Iterator<Item = &CharacterImage> {
        self.images.values()
    }

    /// Look up an image.
    pub fn image(&self, id: &str) -> Option<&CharacterImage> {
        self.images.get(id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Give `id` a label, returning the label it had before.
    ///
    /// Classifying as UNCLASSIFIED removes the image from every label.
    pub fn classify(
        &mut self,
        id: &str,
        label: ClassificationLabel,
    ) -> Result<Option<ClassificationLabel>> {
        if !self.images.contains_key(id) {
            return Err(ReviewError::UnknownImage(id.to_string()));
        }

        let previous = self.assigned.remove(id);
        if let Some(old) = previous {
            let emptied = self.members.get_mut(&old).is_some_and(|set| {
                set.shift_remove(id);
                set.is_empty()
            });
            if emptied {
                self.members.remove(&old);
            }
        }

        if label != ClassificationLabel::Unclassified {
            self.members
                .entry(label)
                .or_default()
                .insert(id.to_string());
            self.assigned.insert(id.to_string(), label);
        }
        Ok(previous)
    }

    /// The label of `id`, if it has one.
    pub fn label_of(&self, id: &str) -> Option<ClassificationLabel> {
        self.assigned.get(id).copied()
    }

    /// Ids holding `label`, in classification order.
    pub fn members(&self, label: ClassificationLabel) -> Vec<&str> {
        self.members
            .get(&label)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Number of images per label, for labels with members.
    pub fn counts(&self) -> BTreeMap<ClassificationLabel, usize> {
        self.members
            .iter()
            .map(|(label, set)| (*label, set.len()))
            .collect()
    }

    /// Number of images with a label.
    pub fn classified_count(&self) -> usize {
        self.assigned.len()
    }

    /// Images without a label, in manifest order.
    pub fn unclassified(&self) -> Vec<&CharacterImage> {
        self.images
            .values()
            .filter(|image| !self.assigned.contains_key(&image.id))
            .collect()
    }

    /// Drop every label.
    pub fn clear(&mut self) {
        self.members.clear();
        self.assigned.clear();
    }

    /// Every classification, grouped by label.
    pub fn records(&self) -> Vec<ReviewRecord> {
        self.members
            .iter()
            .flat_map(|(label, set)| set.iter().map(move |id| (*label, id)))
            .filter_map(|(label, id)| {
                self.images.get(id).map(|image| ReviewRecord {
                    id: image.id.clone(),
                    path: image.path.clone(),
                    classification: label.to_string(),
                    source: image.source_page.clone(),
                    quality: image.quality,
                })
            })
            .collect()
    }

    /// Apply records in order; a later record for the same id wins.
    pub fn apply_records(&mut self, records: &[ReviewRecord]) -> LoadSummary {
        let mut summary = LoadSummary::default();
        for record in records {
            let label = match ClassificationLabel::parse(&record.classification) {
                Ok(label) => label,
                Err(_) => {
                    debug!(
                        "Skipping {} with unknown label {}",
                        record.id, record.classification
                    );
                    summary.unknown_labels += 1;
                    continue;
                }
            };
            match self.classify(&record.id, label) {
                Ok(_) => summary.applied += 1,
                Err(_) => {
                    debug!("Saved label for unknown image {}", record.id);
                    summary.unknown += 1;
                }
            }
        }
        if summary.unknown > 0 {
            warn!(
                "{} saved labels name images outside this session",
                summary.unknown
            );
        }
        if summary.unknown_labels > 0 {
            warn!(
                "{} saved labels are not classification labels",
                summary.unknown_labels
            );
        }
        summary
    }

    /// Write every classification as a JSON array.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let records = self.records();
        tokio::fs::write(path, serde_json::to_vec_pretty(&records)?).await?;
        info!("Saved {} labels to {}", records.len(), path.display());
        Ok(())
    }

    /// Read saved classifications and apply them.
    pub async fn load_records(&mut self, path: impl AsRef<Path>) -> Result<LoadSummary> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        let records: Vec<ReviewRecord> = serde_json::from_str(&text)?;
        Ok(self.apply_records(&records))
    }

    /// Greek letter classifications as font builder input.
    pub fn font_request(&self) -> FontRequest {
        let mut request = FontRequest::new();
        for label in ClassificationLabel::letters() {
            for id in self.members(label) {
                if let Some(image) = self.images.get(id) {
                    request.push(
                        label.as_ref(),
                        GlyphCandidate::new(id, image.path.clone()),
                    );
                }
            }
        }
        request
    }
}
