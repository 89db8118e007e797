//! Font build runs.
//!
//! The `FontBuilder` resolves a request into a [`GlyphPlan`], cleans the
//! configured letters, writes the plan as a JSON job file and hands it to an
//! external font tool, capturing its output.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::clean::clean_file;
use crate::error::{FontError, Result};
use crate::plan::{GlyphPlan, OutlineSource};
use crate::request::FontRequest;
use crate::table::FontMetrics;

/// Placeholder replaced with the job file path in tool arguments.
pub const JOB_PLACEHOLDER: &str = "{job}";

/// Placeholder replaced with the output font path in tool arguments.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Configuration for font builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// External font tool executable.
    pub program: String,

    /// Arguments, with `{job}` and `{output}` substituted.
    pub args: Vec<String>,

    /// Seconds before the tool is killed.
    pub timeout_secs: u64,

    /// Directory generated fonts are written to.
    pub output_dir: PathBuf,

    /// Labels whose images are despeckled before tracing.
    pub despeckle: Vec<String>,

    pub metrics: FontMetrics,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            program: "fontforge".to_string(),
            args: vec![
                "-script".to_string(),
                "generate_font.py".to_string(),
                JOB_PLACEHOLDER.to_string(),
                OUTPUT_PLACEHOLDER.to_string(),
            ],
            timeout_secs: 30,
            output_dir: PathBuf::from("fonts"),
            despeckle: vec!["PHI".to_string(), "PSI".to_string()],
            metrics: FontMetrics::default(),
        }
    }
}

impl FontConfig {
    /// Set the tool command.
    pub fn with_command(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = program.into();
        self.args = args;
        self
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the labels to despeckle.
    pub fn with_despeckle(mut self, labels: Vec<String>) -> Self {
        self.despeckle = labels;
        self
    }

    /// Arguments with placeholders substituted.
    pub fn resolved_args(&self, job: &Path, output: &Path) -> Vec<String> {
        let job = job.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(JOB_PLACEHOLDER, &job)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            })
            .collect()
    }
}

/// Outcome of a font build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontBuildResult {
    /// Whether the tool produced a font.
    pub success: bool,

    /// Path of the generated font, when successful.
    pub font_path: Option<PathBuf>,

    /// Captured tool output.
    pub log: String,

    /// Why the build failed.
    pub error: Option<String>,

    /// Wall time in milliseconds.
    pub duration_ms: u64,

    /// Letters traced from images.
    pub from_images: usize,

    /// Letters drawn as placeholders.
    pub placeholders: usize,

    /// Labels of the placeholder letters.
    pub missing: Vec<String>,
}

impl FontBuildResult {
    /// Create a successful result.
    pub fn success(font_path: PathBuf, plan: &GlyphPlan, duration_ms: u64) -> Self {
        Self {
            success: true,
            font_path: Some(font_path),
            log: String::new(),
            error: None,
            duration_ms,
            from_images: plan.from_images(),
            placeholders: plan.placeholders(),
            missing: plan.missing(),
        }
    }

    /// Create a failed result.
    pub fn failure(error: impl Into<String>, plan: &GlyphPlan, duration_ms: u64) -> Self {
        Self {
            success: false,
            font_path: None,
            log: String::new(),
            error: Some(error.into()),
            duration_ms,
            from_images: plan.from_images(),
            placeholders: plan.placeholders(),
            missing: plan.missing(),
        }
    }

    /// Attach captured output.
    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }
}

/// Runs the external font tool over reviewed glyphs.
pub struct FontBuilder {
    config: FontConfig,
    timeout: Duration,
}

impl FontBuilder {
    /// Create a builder.
    pub fn new(config: FontConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        Self { config, timeout }
    }

    /// Override the tool timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The builder configuration.
    pub fn config(&self) -> &FontConfig {
        &self.config
    }

    /// Resolve the plan and clean configured letters into `workdir`.
    pub async fn prepare_plan(&self, request: &FontRequest, workdir: &Path) -> Result<GlyphPlan> {
        let request = request.clone();
        let metrics = self.config.metrics;
        let despeckle = self.config.despeckle.clone();
        let workdir = workdir.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut plan = GlyphPlan::resolve(&request, metrics);
            for label in &despeckle {
                clean_letter(&mut plan, label, &workdir);
            }
            plan
        })
        .await
        .map_err(|e| FontError::Io(std::io::Error::other(e)))
    }

    /// Build a font from `request`.
    ///
    /// Tool failures and timeouts are reported through
    /// [`FontBuildResult::success`]; only setup problems are errors.
    pub async fn build(&self, request: &FontRequest) -> Result<FontBuildResult> {
        let start = Instant::now();
        if self.config.program.trim().is_empty() {
            return Err(FontError::InvalidRequest(
                "font tool program is empty".to_string(),
            ));
        }

        let workdir = tempfile::TempDir::new()?;
        let plan = self.prepare_plan(request, workdir.path()).await?;
        info!(
            "Building {} with {} traced letters and {} placeholders",
            plan.family_name,
            plan.from_images(),
            plan.placeholders()
        );

        let job_path = workdir.path().join("job.json");
        tokio::fs::write(&job_path, serde_json::to_vec_pretty(&plan)?).await?;

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let output_path = self.config.output_dir.join(output_file_name(&plan.family_name));

        let args = self.config.resolved_args(&job_path, &output_path);
        debug!("Running {} {:?}", self.config.program, args);

        let child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FontError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        let waited = tokio::time::timeout(self.timeout, child.wait_with_output()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let output = match waited {
            Ok(output) => output?,
            Err(_) => {
                warn!(
                    "{} timed out after {}ms",
                    self.config.program,
                    self.timeout.as_millis()
                );
                return Ok(FontBuildResult::failure(
                    format!("font tool timed out after {}s", self.timeout.as_secs_f32()),
                    &plan,
                    duration_ms,
                ));
            }
        };

        let log = capture_log(&output.stdout, &output.stderr);
        let result = if !output.status.success() {
            warn!("{} failed: {}", self.config.program, output.status);
            FontBuildResult::failure(
                format!("font tool exited with {}", output.status),
                &plan,
                duration_ms,
            )
        } else if !tokio::fs::try_exists(&output_path).await? {
            warn!("{} produced no font", self.config.program);
            FontBuildResult::failure("font tool produced no output file", &plan, duration_ms)
        } else {
            info!("Font written to {} in {duration_ms}ms", output_path.display());
            FontBuildResult::success(output_path, &plan, duration_ms)
        };

        Ok(result.with_log(log))
    }
}

impl Default for FontBuilder {
    fn default() -> Self {
        Self::new(FontConfig::default())
    }
}

/// `sinaiticus_20250101_120000.ttf` for the default family.
pub fn output_file_name(family: &str) -> String {
    let stem: String = family
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    format!("{stem}_{timestamp}.ttf")
}

fn clean_letter(plan: &mut GlyphPlan, label: &str, workdir: &Path) {
    let source = plan
        .letters
        .iter()
        .find(|g| g.label == label)
        .map(|g| g.source.clone());
    let Some(OutlineSource::Image { path, .. }) = source else {
        return;
    };

    let cleaned = workdir.join(format!("cleaned_{}.png", label.to_lowercase()));
    match clean_file(&path, &cleaned, label) {
        Ok(Some(_)) => {
            plan.replace_path(label, cleaned);
        }
        Ok(None) => {}
        Err(e) => warn!("Keeping uncleaned {label}: {e}"),
    }
}

fn capture_log(stdout: &[u8], stderr: &[u8]) -> String {
    let mut log = String::from_utf8_lossy(stdout).into_owned();
    let stderr = String::from_utf8_lossy(stderr);
    if !stderr.is_empty() {
        if !log.is_empty() && !log.ends_with('\n') {
            log.push('\n');
        }
        log.push_str(&stderr);
    }
    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = FontConfig::default();
        assert_eq!(config.program, "fontforge");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.despeckle, vec!["PHI", "PSI"]);
    }

    #[test]
    fn test_placeholders_substituted() {
        let config = FontConfig::default()
            .with_command("tool", vec!["--job={job}".to_string(), "{output}".to_string()]);
        let args = config.resolved_args(Path::new("/tmp/job.json"), Path::new("out.ttf"));
        assert_eq!(args, vec!["--job=/tmp/job.json", "out.ttf"]);
    }

    #[test]
    fn test_output_file_name() {
        let name = output_file_name("Sinaiticus");
        assert!(name.starts_with("sinaiticus_"));
        assert!(name.ends_with(".ttf"));
        assert_eq!(name.len(), "sinaiticus_20250101_120000.ttf".len());
    }

    #[test]
    fn test_capture_log_joins_streams() {
        assert_eq!(capture_log(b"out", b"err"), "out\nerr");
        assert_eq!(capture_log(b"", b"err"), "err");
        assert_eq!(capture_log(b"out\n", b""), "out\n");
    }

    #[tokio::test]
    async fn test_speck_only_letter_keeps_original_image() {
        use crate::request::GlyphCandidate;
        use image::{GrayImage, Luma};

        let dir = tempfile::TempDir::new().unwrap();
        let original = dir.path().join("psi.png");
        let mut bitmap = GrayImage::from_pixel(30, 30, Luma([255]));
        for y in 10..16 {
            for x in 10..16 {
                bitmap.put_pixel(x, y, Luma([0]));
            }
        }
        bitmap.save(&original).unwrap();
        let request = FontRequest::new()
            .with_candidate("PSI", GlyphCandidate::new("letter_00000", original.clone()));

        let plan = FontBuilder::new(FontConfig::default())
            .prepare_plan(&request, dir.path())
            .await
            .unwrap();

        let psi = plan.letters.iter().find(|g| g.label == "PSI").unwrap();
        assert!(
            matches!(&psi.source, OutlineSource::Image { path, .. } if *path == original),
            "{:?}",
            psi.source
        );
        assert!(!dir.path().join("cleaned_psi.png").exists());
    }

    #[tokio::test]
    async fn test_empty_program_rejected() {
        let builder = FontBuilder::new(FontConfig::default().with_command("  ", vec![]));
        let err = builder.build(&FontRequest::new()).await.unwrap_err();
        assert!(matches!(err, FontError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let out = tempfile::TempDir::new().unwrap();
        let builder = FontBuilder::new(
            FontConfig::default()
                .with_command("/nonexistent/uncial-font-tool", vec![])
                .with_output_dir(out.path()),
        );
        let err = builder.build(&FontRequest::new()).await.unwrap_err();
        assert!(matches!(err, FontError::Spawn { .. }));
    }
}
