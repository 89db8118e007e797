//! A review session from raw page glyphs to saved labels and a font run.

use std::path::Path;

use image::{GrayImage, Luma};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use uncial_review::{
    CancellationToken, ClassificationLabel, ClusterScope, FontConfig, ReviewEngine,
    prepare_review_set,
};

fn write_glyph(path: &Path, ink: bool) {
    let bitmap = GrayImage::from_fn(24, 24, |x, y| {
        if ink && (6..18).contains(&x) && (4..20).contains(&y) {
            Luma([0])
        } else {
            Luma([255])
        }
    });
    bitmap.save(path).unwrap();
}

/// Three blank crops and three inked ones, blanks ranked higher.
fn glyph_tree() -> TempDir {
    let glyphs = TempDir::new().unwrap();
    let page = glyphs.path().join("page_01");
    std::fs::create_dir(&page).unwrap();
    for (i, quality) in [99, 98, 97].into_iter().enumerate() {
        write_glyph(&page.join(format!("char_{i:04}_q{quality}.png")), false);
    }
    for (i, quality) in [96, 95, 94].into_iter().enumerate() {
        write_glyph(&page.join(format!("char_{:04}_q{quality}.png", i + 3)), true);
    }
    glyphs
}

#[tokio::test]
async fn prepare_cluster_label_and_reload() {
    let glyphs = glyph_tree();
    let review = TempDir::new().unwrap();

    let manifest = prepare_review_set(glyphs.path(), review.path()).unwrap();
    assert_eq!(manifest.len(), 6);

    let engine = ReviewEngine::builder()
        .with_review_dir(review.path())
        .with_cluster_grid(8)
        .build()
        .await
        .unwrap();

    let report = engine
        .cluster(ClusterScope::All, 2, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.skipped_count(), 0);
    let blank = report.cluster_of("letter_00000").unwrap();
    let inked: Vec<String> = report
        .clusters
        .iter()
        .find(|c| c.label != blank)
        .map(|c| c.members.clone())
        .unwrap();
    assert_eq!(
        inked,
        vec!["letter_00003", "letter_00004", "letter_00005"]
    );

    engine
        .classify_many(&inked, ClassificationLabel::Omicron)
        .await
        .unwrap();
    engine
        .classify("letter_00000", ClassificationLabel::NonLetter)
        .await
        .unwrap();
    let saved = engine.save_labels().await.unwrap();
    assert!(saved.starts_with(review.path()));

    let reopened = ReviewEngine::builder()
        .with_review_dir(review.path())
        .build()
        .await
        .unwrap();
    let summary = reopened.load_labels().await.unwrap();
    assert_eq!(summary.applied, 4);

    let stats = reopened.stats().await;
    assert_eq!(stats.classified, 4);
    assert_eq!(stats.labels[&ClassificationLabel::Omicron], 3);

    let rest = reopened
        .cluster(ClusterScope::Unclassified, 5, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(rest.k, 2);
    assert_eq!(rest.member_count(), 2);
}

#[tokio::test]
async fn similar_search_over_prepared_set() {
    let glyphs = glyph_tree();
    let review = TempDir::new().unwrap();
    prepare_review_set(glyphs.path(), review.path()).unwrap();
    std::fs::write(review.path().join("letter_00001.png"), b"damaged").unwrap();

    let engine = ReviewEngine::builder()
        .with_review_dir(review.path())
        .build()
        .await
        .unwrap();

    let report = engine
        .find_similar("letter_00004", None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.grid, 32);
    assert_eq!(report.skipped_count(), 1);
    assert_eq!(report.skipped[0].id, "letter_00001");
    assert_eq!(
        &report.ids()[..3],
        &["letter_00004", "letter_00003", "letter_00005"]
    );
}

#[tokio::test]
async fn missing_labels_file_is_not_an_error() {
    let glyphs = glyph_tree();
    let review = TempDir::new().unwrap();
    prepare_review_set(glyphs.path(), review.path()).unwrap();

    let engine = ReviewEngine::builder()
        .with_review_dir(review.path())
        .build()
        .await
        .unwrap();

    assert_eq!(engine.load_labels().await.unwrap().applied, 0);
}

#[cfg(unix)]
#[tokio::test]
async fn labels_feed_the_font_tool() {
    let glyphs = glyph_tree();
    let review = TempDir::new().unwrap();
    let fonts = TempDir::new().unwrap();
    prepare_review_set(glyphs.path(), review.path()).unwrap();

    let font = FontConfig::default()
        .with_command(
            "sh",
            vec![
                "-c".to_string(),
                "cp \"$0\" \"$1\"".to_string(),
                "{job}".to_string(),
                "{output}".to_string(),
            ],
        )
        .with_output_dir(fonts.path());
    let engine = ReviewEngine::builder()
        .with_review_dir(review.path())
        .with_font(font)
        .build()
        .await
        .unwrap();
    engine
        .classify("letter_00003", ClassificationLabel::Alpha)
        .await
        .unwrap();
    engine
        .classify("letter_00004", ClassificationLabel::Period)
        .await
        .unwrap();

    let result = engine.build_font().await.unwrap();

    assert!(result.success, "{result:?}");
    assert_eq!(result.from_images, 1);
    assert_eq!(result.missing.len(), 23);
    let job: serde_json::Value =
        serde_json::from_slice(&std::fs::read(result.font_path.unwrap()).unwrap()).unwrap();
    assert_eq!(job["letters"][0]["source"]["image_id"], "letter_00003");
    assert!(job["ignored_labels"].as_array().unwrap().is_empty());
}
