//! Command line definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Number of clusters when `-k` is not given.
pub const DEFAULT_CLUSTERS: usize = 30;

/// Curate manuscript glyph images and build a font from them.
#[derive(Parser, Debug)]
#[command(name = "uncial", version, propagate_version = true)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Review directory, overriding the configuration
    #[arg(long, global = true, value_name = "DIR")]
    pub review_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy page glyphs into a review directory and write its manifest
    Prepare(PrepareArgs),

    /// Group review images with k-means
    Cluster(ClusterArgs),

    /// Rank review images by similarity to one of them
    Similar(SimilarArgs),

    /// Build a font from saved classifications
    Font(FontArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Directory with one sub-directory of glyphs per page
    #[arg(long, value_name = "DIR")]
    pub glyphs: PathBuf,

    /// Review directory to create (defaults to the configured one)
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ClusterArgs {
    /// Number of clusters
    #[arg(short = 'k', long = "clusters", default_value_t = DEFAULT_CLUSTERS)]
    pub k: usize,

    /// Grid resolution for features
    #[arg(long)]
    pub grid: Option<u32>,

    /// Only cluster images without a saved label
    #[arg(long, default_value_t = false)]
    pub unclassified: bool,

    /// Saved classifications to apply first
    #[arg(long, value_name = "FILE")]
    pub labels: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SimilarArgs {
    /// Id of the reference image, e.g. letter_00042
    #[arg(long)]
    pub reference: String,

    /// Maximum number of matches
    #[arg(long)]
    pub limit: Option<usize>,

    /// Grid resolution for features
    #[arg(long)]
    pub grid: Option<u32>,
}

#[derive(Args, Debug)]
pub struct FontArgs {
    /// Saved classifications (defaults to the configured labels file)
    #[arg(long, value_name = "FILE")]
    pub labels: Option<PathBuf>,

    /// Directory for the generated font
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cluster_defaults() {
        let cli = Cli::try_parse_from(["uncial", "cluster", "--unclassified"]).unwrap();
        let Command::Cluster(args) = cli.command else {
            panic!("expected cluster");
        };
        assert_eq!(args.k, DEFAULT_CLUSTERS);
        assert_eq!(args.grid, None);
        assert!(args.unclassified);
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::try_parse_from([
            "uncial",
            "similar",
            "--reference",
            "letter_00007",
            "--limit",
            "25",
            "--config",
            "uncial.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("uncial.toml")));
        let Command::Similar(args) = cli.command else {
            panic!("expected similar");
        };
        assert_eq!(args.reference, "letter_00007");
        assert_eq!(args.limit, Some(25));
    }

    #[test]
    fn test_prepare_requires_glyphs() {
        assert!(Cli::try_parse_from(["uncial", "prepare"]).is_err());
        let cli = Cli::try_parse_from(["uncial", "cluster", "-k", "12"]).unwrap();
        assert!(matches!(cli.command, Command::Cluster(ClusterArgs { k: 12, .. })));
    }
}
