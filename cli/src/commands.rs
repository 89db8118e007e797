//! Subcommand handlers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use tracing::{info, warn};
use uncial_review::{
    CancellationToken, ClusterReport, ClusterScope, ReviewConfig, ReviewEngine, prepare_review_set,
};

use crate::cli::{Cli, ClusterArgs, Command, FontArgs, PrepareArgs, SimilarArgs};

/// Run one parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref()).await?;
    if let Some(dir) = cli.review_dir {
        config.review_dir = dir;
    }

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            watcher.cancel();
        }
    });

    match cli.command {
        Command::Prepare(args) => prepare(config, args).await,
        Command::Cluster(args) => cluster(config, args, &cancel).await,
        Command::Similar(args) => similar(config, args, &cancel).await,
        Command::Font(args) => font(config, args).await,
    }
}

async fn load_config(path: Option<&Path>) -> Result<ReviewConfig> {
    match path {
        Some(path) => ReviewConfig::load(path)
            .await
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(ReviewConfig::default()),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_engine(config: ReviewConfig, labels: Option<&Path>) -> Result<ReviewEngine> {
    let review_dir = config.review_dir.clone();
    let engine = ReviewEngine::builder()
        .with_config(config)
        .build()
        .await
        .with_context(|| format!("failed to open review directory {}", review_dir.display()))?;

    let summary = match labels {
        Some(path) => engine
            .session()
            .write()
            .await
            .load_records(path)
            .await
            .with_context(|| format!("failed to read labels {}", path.display()))?,
        None => engine.load_labels().await?,
    };
    info!(
        "Applied {} saved labels ({} unknown images, {} unknown labels)",
        summary.applied, summary.unknown, summary.unknown_labels
    );
    Ok(engine)
}

#[derive(Serialize)]
struct PrepareSummary {
    letters: usize,
    review_dir: PathBuf,
}

async fn prepare(config: ReviewConfig, args: PrepareArgs) -> Result<()> {
    let review_dir = args.out.unwrap_or(config.review_dir);
    let glyphs = args.glyphs;
    let out = review_dir.clone();
    let manifest = tokio::task::spawn_blocking(move || prepare_review_set(&glyphs, &out))
        .await?
        .context("failed to prepare review set")?;

    print_json(&PrepareSummary {
        letters: manifest.len(),
        review_dir,
    })
}

/// Cluster output without centroids.
#[derive(Serialize)]
struct ClusterSummary {
    requested_k: usize,
    k: usize,
    grid: u32,
    iterations: usize,
    converged: bool,
    skipped: Vec<String>,
    clusters: BTreeMap<usize, Vec<String>>,
}

impl From<ClusterReport> for ClusterSummary {
    fn from(report: ClusterReport) -> Self {
        Self {
            clusters: report.assignments(),
            requested_k: report.requested_k,
            k: report.k,
            grid: report.grid,
            iterations: report.iterations,
            converged: report.converged,
            skipped: report.skipped.into_iter().map(|s| s.id).collect(),
        }
    }
}

async fn cluster(
    mut config: ReviewConfig,
    args: ClusterArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    if let Some(grid) = args.grid {
        config.cluster.grid = grid;
    }
    let engine = open_engine(config, args.labels.as_deref()).await?;
    let scope = if args.unclassified {
        ClusterScope::Unclassified
    } else {
        ClusterScope::All
    };

    let report = engine.cluster(scope, args.k, cancel).await?;
    print_json(&ClusterSummary::from(report))
}

async fn similar(
    mut config: ReviewConfig,
    args: SimilarArgs,
    cancel: &CancellationToken,
) -> Result<()> {
    if let Some(grid) = args.grid {
        config.similarity.grid = grid;
    }
    let engine = open_engine(config, None).await?;
    let report = engine
        .find_similar(&args.reference, args.limit, cancel)
        .await?;
    print_json(&report)
}

async fn font(mut config: ReviewConfig, args: FontArgs) -> Result<()> {
    if let Some(out) = args.out {
        config.font.output_dir = out;
    }
    let engine = open_engine(config, args.labels.as_deref()).await?;
    let result = engine.build_font().await?;
    print_json(&result)?;
    if !result.success {
        bail!(
            "font build failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
