//! End-to-end behaviour of the glyph core: extraction, clustering and
//! similarity search sharing one cache.

use std::collections::HashSet;
use std::sync::Arc;

use image::{GrayImage, Luma};
use pretty_assertions::assert_eq;
use uncial_glyphs::{
    CancellationToken, CharacterImage, ClusterEngine, FeatureExtractor, FileGlyphSource,
    GlyphError, MemoryGlyphSource, SimilarityEngine,
};

fn record(id: &str) -> CharacterImage {
    CharacterImage::new(id, format!("{id}.png"))
}

/// A near-blank page crop with one faint speck.
fn blank_with_speck(x: u32, y: u32, value: u8) -> GrayImage {
    let mut bitmap = GrayImage::from_pixel(32, 32, Luma([255]));
    bitmap.put_pixel(x, y, Luma([value]));
    bitmap
}

/// Dense ink on every other 8-pixel band.
fn inked() -> GrayImage {
    GrayImage::from_fn(32, 32, |x, _| {
        if (x / 8) % 2 == 0 {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// A deterministic, varied glyph.
fn textured(seed: u32) -> GrayImage {
    GrayImage::from_fn(8, 8, |x, y| Luma([((seed * 37 + x * 11 + y * 7) % 256) as u8]))
}

#[test]
fn blanks_cluster_apart_from_ink() {
    let source = MemoryGlyphSource::new()
        .with("blank1", GrayImage::from_pixel(32, 32, Luma([255])))
        .with("blank2", blank_with_speck(3, 3, 250))
        .with("blank3", blank_with_speck(20, 20, 245))
        .with("ink", inked());
    let engine = ClusterEngine::new(Arc::new(FeatureExtractor::new(Arc::new(source))));
    let images: Vec<_> = ["blank1", "blank2", "blank3", "ink"]
        .into_iter()
        .map(record)
        .collect();

    let report = engine
        .cluster(&images, 2, &CancellationToken::new())
        .unwrap();

    let blanks = report.cluster_of("blank1").unwrap();
    assert_eq!(report.cluster_of("blank2"), Some(blanks));
    assert_eq!(report.cluster_of("blank3"), Some(blanks));
    assert_ne!(report.cluster_of("ink"), Some(blanks));
    assert!(report.converged);
}

#[test]
fn clustering_partitions_readable_images_and_is_reproducible() {
    let mut source = MemoryGlyphSource::new();
    let mut images = Vec::new();
    for i in 0..120 {
        let id = format!("letter_{i:05}");
        if i % 17 != 5 {
            source.insert(id.clone(), textured(i));
        }
        images.push(record(&id));
    }
    let extractor = Arc::new(FeatureExtractor::new(Arc::new(source)));
    let engine = ClusterEngine::new(extractor);

    let first = engine
        .cluster(&images, 6, &CancellationToken::new())
        .unwrap();
    let second = engine
        .cluster(&images, 6, &CancellationToken::new())
        .unwrap();
    assert_eq!(first, second);

    let skipped: HashSet<String> = first.skipped.iter().map(|s| s.id.clone()).collect();
    let mut members = HashSet::new();
    for cluster in &first.clusters {
        for id in &cluster.members {
            assert!(members.insert(id.clone()), "{id} assigned twice");
        }
    }
    let expected: HashSet<String> = images
        .iter()
        .map(|i| i.id.clone())
        .filter(|id| !skipped.contains(id))
        .collect();
    assert_eq!(members, expected);
    assert_eq!(first.skipped_count(), 7);
    assert!(first.iterations <= 50);
}

#[test]
fn clustering_invalidates_previously_cached_vectors() {
    let source = MemoryGlyphSource::new()
        .with("x", textured(1))
        .with("y", textured(2))
        .with("z", textured(3));
    let extractor = Arc::new(FeatureExtractor::new(Arc::new(source)));
    let engine = ClusterEngine::with_config(
        Arc::clone(&extractor),
        uncial_glyphs::ClusterConfig {
            grid: 16,
            max_iterations: 50,
        },
    );

    extractor.extract(&record("x"), 16).unwrap();
    assert!(extractor.cache().contains("x", 16));

    engine
        .cluster(&[record("y"), record("z")], 2, &CancellationToken::new())
        .unwrap();
    assert!(!extractor.cache().contains("x", 16));

    let misses_before = extractor.cache().stats().misses;
    extractor.extract(&record("x"), 16).unwrap();
    assert_eq!(extractor.cache().stats().misses, misses_before + 1);
}

#[test]
fn cancelled_clustering_leaves_cache_intact() {
    let source = MemoryGlyphSource::new()
        .with("x", textured(1))
        .with("y", textured(2));
    let extractor = Arc::new(FeatureExtractor::new(Arc::new(source)));
    let engine = ClusterEngine::new(Arc::clone(&extractor));
    extractor.extract(&record("x"), 16).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = engine
        .cluster(&[record("x"), record("y")], 2, &cancel)
        .unwrap_err();

    assert!(matches!(err, GlyphError::Cancelled));
    assert!(extractor.cache().contains("x", 16));
    assert_eq!(extractor.cache().len(), 1);
}

#[test]
fn find_similar_over_500_candidates() {
    let mut source = MemoryGlyphSource::new();
    let mut candidates = Vec::new();
    for i in 0..500 {
        let id = format!("c{i}");
        source.insert(id.clone(), textured(i));
        candidates.push(record(&id));
    }
    let engine = SimilarityEngine::new(Arc::new(FeatureExtractor::new(Arc::new(source))));
    let reference = candidates[123].clone();

    let report = engine
        .find_similar(&reference, &candidates, 32, 200, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.matches.len(), 200);
    assert_eq!(report.matches[0].image_id, "c123");
    assert_eq!(report.matches[0].distance, 0.0);
    assert!(
        report
            .matches
            .windows(2)
            .all(|w| w[0].distance <= w[1].distance)
    );
}

#[test]
fn find_similar_skips_one_unreadable_file() {
    let dir = tempfile::TempDir::new().unwrap();
    for i in 0..5 {
        textured(i).save(dir.path().join(format!("g{i}.png"))).unwrap();
    }
    std::fs::write(dir.path().join("g5.png"), b"corrupt").unwrap();

    let source = FileGlyphSource::new().with_root(dir.path());
    let engine = SimilarityEngine::new(Arc::new(FeatureExtractor::new(Arc::new(source))));
    let candidates: Vec<_> = (0..6).map(|i| record(&format!("g{i}"))).collect();

    let report = engine
        .find_similar(&candidates[0], &candidates, 16, 200, &CancellationToken::new())
        .unwrap();

    assert_eq!(report.matches.len(), 5);
    assert_eq!(report.skipped_count(), 1);
    assert_eq!(report.skipped[0].id, "g5");
    assert_eq!(report.matches[0].image_id, "g0");
}

#[test]
fn extraction_is_deterministic_across_extractors() {
    let source = Arc::new(MemoryGlyphSource::new().with("x", textured(9)));
    let a = FeatureExtractor::new(source.clone())
        .extract(&record("x"), 32)
        .unwrap();
    let b = FeatureExtractor::new(source)
        .extract(&record("x"), 32)
        .unwrap();

    assert_eq!(a, b);
    assert!(a.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
}
