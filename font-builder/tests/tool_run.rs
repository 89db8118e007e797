//! Runs of a stand-in font tool driven through `sh`.
#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use image::{GrayImage, Luma};
use pretty_assertions::assert_eq;
use uncial_font::{FontBuilder, FontConfig, FontRequest, GlyphCandidate};

fn sh(script: &str) -> Vec<String> {
    vec![
        "-c".to_string(),
        script.to_string(),
        "{job}".to_string(),
        "{output}".to_string(),
    ]
}

fn write_letter(dir: &Path, name: &str) -> std::path::PathBuf {
    let mut bitmap = GrayImage::from_pixel(40, 40, Luma([255]));
    for y in 5..35 {
        for x in 10..30 {
            bitmap.put_pixel(x, y, Luma([0]));
        }
    }
    bitmap.put_pixel(2, 2, Luma([0]));
    let path = dir.join(name);
    bitmap.save(&path).unwrap();
    path
}

#[tokio::test]
async fn tool_receives_plan_and_writes_font() {
    let images = tempfile::TempDir::new().unwrap();
    let out = tempfile::TempDir::new().unwrap();
    let alpha = write_letter(images.path(), "alpha.png");
    let phi = write_letter(images.path(), "phi.png");
    std::fs::write(images.path().join("bad.png"), b"not a png").unwrap();

    let request = FontRequest::new()
        .with_candidate("ALPHA", GlyphCandidate::new("bad", images.path().join("bad.png")))
        .with_candidate("ALPHA", GlyphCandidate::new("a", &alpha))
        .with_candidate("PHI", GlyphCandidate::new("f", &phi))
        .with_candidate("NON_LETTER", GlyphCandidate::new("n", &alpha));

    let builder = FontBuilder::new(
        FontConfig::default()
            .with_command("sh", sh("echo tracing; cat \"$0\" > \"$1\""))
            .with_output_dir(out.path()),
    );
    let result = builder.build(&request).await.unwrap();

    assert!(result.success, "{result:?}");
    assert_eq!(result.from_images, 2);
    assert_eq!(result.placeholders, 22);
    assert!(!result.missing.contains(&"ALPHA".to_string()));
    assert_eq!(result.log, "tracing\n");

    let font_path = result.font_path.unwrap();
    assert!(font_path.starts_with(out.path()));
    let job: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&font_path).unwrap()).unwrap();
    assert_eq!(job["family_name"], "Sinaiticus");
    assert_eq!(job["letters"][0]["source"]["image_id"], "a");
    assert_eq!(job["ignored_labels"][0], "NON_LETTER");

    let phi_path = job["letters"][20]["source"]["path"].as_str().unwrap();
    assert!(phi_path.ends_with("cleaned_phi.png"), "{phi_path}");
}

#[tokio::test]
async fn failing_tool_reports_log() {
    let out = tempfile::TempDir::new().unwrap();
    let builder = FontBuilder::new(
        FontConfig::default()
            .with_command("sh", sh("echo boom >&2; exit 3"))
            .with_output_dir(out.path()),
    );

    let result = builder.build(&FontRequest::new()).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.font_path, None);
    assert!(result.log.contains("boom"));
    assert_eq!(result.placeholders, 24);
}

#[tokio::test]
async fn tool_without_output_is_failure() {
    let out = tempfile::TempDir::new().unwrap();
    let builder = FontBuilder::new(
        FontConfig::default()
            .with_command("sh", sh("true"))
            .with_output_dir(out.path()),
    );

    let result = builder.build(&FontRequest::new()).await.unwrap();

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("font tool produced no output file")
    );
}

#[tokio::test]
async fn slow_tool_times_out() {
    let out = tempfile::TempDir::new().unwrap();
    let builder = FontBuilder::new(
        FontConfig::default()
            .with_command("sh", sh("sleep 5"))
            .with_output_dir(out.path()),
    )
    .with_timeout(Duration::from_millis(200));

    let result = builder.build(&FontRequest::new()).await.unwrap();

    assert!(!result.success);
    assert!(result.error.unwrap().contains("timed out"));
    assert!(result.duration_ms < 5000);
}
