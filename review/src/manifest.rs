//! The review manifest and preparation of a review directory.
//!
//! A glyph directory holds one sub-directory per manuscript page, each with
//! cropped PNGs and an optional `metadata.json`. Preparation copies every
//! glyph into a flat review directory as `letter_NNNNN.png`, best quality
//! first, and writes `manifest.json` describing them.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uncial_glyphs::CharacterImage;
use walkdir::WalkDir;

use crate::error::{Result, ReviewError};

/// Manifest file written by [`prepare_review_set`].
pub const MANIFEST_FILE: &str = "manifest.json";

/// Quality assumed when neither metadata nor file name provides one.
pub const DEFAULT_QUALITY: u32 = 85;

/// Dimensions recorded when an image header cannot be read.
pub const FALLBACK_DIMENSIONS: (u32, u32) = (40, 40);

/// One prepared letter image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: u32,
    pub filename: String,

    /// Name of the page directory the glyph came from.
    pub source: String,

    /// The scanned page image.
    pub source_image: String,

    /// Quality score, 0 to 100.
    pub quality: u32,
    pub width: u32,
    pub height: u32,

    /// Bounding box on the source page, in whatever shape the cropper wrote.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<serde_json::Value>,
}

impl ManifestEntry {
    /// Image identifier used throughout a review session.
    pub fn image_id(&self) -> String {
        format!("letter_{:05}", self.id)
    }

    /// Convert to a glyph record rooted at `review_dir`.
    pub fn to_image(&self, review_dir: &Path) -> CharacterImage {
        CharacterImage::new(self.image_id(), review_dir.join(&self.filename))
            .with_source_page(self.source.as_str())
            .with_dimensions(self.width, self.height)
            .with_quality(self.quality as f32)
    }
}

/// The `{"letters": [...]}` manifest document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub letters: Vec<ManifestEntry>,
}

impl Manifest {
    /// Parse a manifest document.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Load a manifest file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ReviewError::manifest(path, e))?;
        let manifest = Self::from_json(&text).map_err(|e| ReviewError::manifest(path, e))?;
        debug!(
            "Loaded {} manifest entries from {}",
            manifest.letters.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Write the manifest as pretty JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        tokio::fs::write(path, serde_json::to_vec_pretty(self)?).await?;
        Ok(())
    }

    /// Glyph records for every entry.
    pub fn to_images(&self, review_dir: &Path) -> Vec<CharacterImage> {
        self.letters
            .iter()
            .map(|entry| entry.to_image(review_dir))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }
}

/// `metadata.json` in a page directory: either an object or a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PageMetadata {
    Page {
        #[serde(default)]
        source_image: Option<String>,
        #[serde(default)]
        characters: Vec<GlyphMetadata>,
    },
    List(Vec<GlyphMetadata>),
}

#[derive(Debug, Deserialize)]
struct GlyphMetadata {
    file: String,
    #[serde(default)]
    quality: Option<f64>,
    #[serde(default)]
    bbox: Option<serde_json::Value>,
    #[serde(default)]
    source_image: Option<String>,
}

/// A glyph found while walking, before it is numbered.
#[derive(Debug)]
struct FoundGlyph {
    path: PathBuf,
    source: String,
    source_image: String,
    quality: u32,
    width: u32,
    height: u32,
    bbox: Option<serde_json::Value>,
}

/// Quality encoded in a file stem like `char_0012_q92`.
pub fn quality_from_stem(stem: &str) -> u32 {
    stem.split('_')
        .nth(2)
        .and_then(|part| part.strip_prefix('q'))
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(DEFAULT_QUALITY)
}

fn read_page_metadata(dir: &Path) -> Option<(Option<String>, HashMap<String, GlyphMetadata>)> {
    let path = dir.join("metadata.json");
    let text = std::fs::read_to_string(&path).ok()?;
    let metadata: PageMetadata = match serde_json::from_str(&text) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Ignoring unreadable {}: {e}", path.display());
            return None;
        }
    };
    let (source_image, characters) = match metadata {
        PageMetadata::Page {
            source_image,
            characters,
        } => (source_image, characters),
        PageMetadata::List(characters) => (None, characters),
    };
    let by_file = characters
        .into_iter()
        .map(|c| (c.file.clone(), c))
        .collect();
    Some((source_image, by_file))
}

fn scan_page(dir: &Path) -> Vec<FoundGlyph> {
    let source = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (page_image, metadata) = read_page_metadata(dir).unwrap_or_default();
    let page_image = page_image.unwrap_or_else(|| format!("{source}.jpg"));

    let files = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"));

    files
        .map(|entry| {
            let path = entry.path().to_path_buf();
            let filename = entry.file_name().to_string_lossy().into_owned();
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let meta = metadata.get(&filename);

            let quality = match meta.and_then(|m| m.quality) {
                Some(q) => (q * 100.0) as u32,
                None => quality_from_stem(&stem),
            };
            let (width, height) =
                image::image_dimensions(&path).unwrap_or(FALLBACK_DIMENSIONS);

            FoundGlyph {
                source: source.clone(),
                source_image: meta
                    .and_then(|m| m.source_image.clone())
                    .unwrap_or_else(|| page_image.clone()),
                quality,
                width,
                height,
                bbox: meta.and_then(|m| m.bbox.clone()),
                path,
            }
        })
        .collect()
}

/// Copy every page glyph under `glyph_dir` into `review_dir` and write the
/// manifest.
///
/// Glyphs are ordered by quality, highest first; equal qualities keep page
/// and file name order. Blocking; run it off the async runtime.
pub fn prepare_review_set(glyph_dir: &Path, review_dir: &Path) -> Result<Manifest> {
    if !glyph_dir.is_dir() {
        return Err(ReviewError::manifest(glyph_dir, "not a directory"));
    }
    std::fs::create_dir_all(review_dir)?;

    let pages = WalkDir::new(glyph_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_dir());

    let mut found: Vec<FoundGlyph> = pages.flat_map(|page| scan_page(page.path())).collect();
    info!(
        "Found {} character images in {}",
        found.len(),
        glyph_dir.display()
    );
    found.sort_by_key(|g| Reverse(g.quality));

    let mut manifest = Manifest::default();
    for (i, glyph) in found.into_iter().enumerate() {
        let filename = format!("letter_{i:05}.png");
        std::fs::copy(&glyph.path, review_dir.join(&filename))?;
        manifest.letters.push(ManifestEntry {
            id: i as u32,
            filename,
            source: glyph.source,
            source_image: glyph.source_image,
            quality: glyph.quality,
            width: glyph.width,
            height: glyph.height,
            bbox: glyph.bbox,
        });
        if (i + 1) % 500 == 0 {
            debug!("Copied {} glyphs", i + 1);
        }
    }

    let manifest_path = review_dir.join(MANIFEST_FILE);
    std::fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)?;
    info!(
        "Prepared {} letters in {}",
        manifest.len(),
        review_dir.display()
    );
    Ok(manifest)
}
