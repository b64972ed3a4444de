//! Loupe Command Line Interface
//!
//! A CLI tool for ingesting embeddings into a Loupe catalog, querying
//! neighbors and inspecting duplicate groups.

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{groups, ingest, maintain, query, remove, stats, CatalogArgs};
use crate::error::Result;

/// Loupe Command Line Interface
///
/// Similarity search and near-duplicate detection for product-image embeddings.
#[derive(Parser, Debug)]
#[command(name = "loupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the catalog file
    #[arg(short, long, env = "LOUPE_DB", global = true)]
    pub database: Option<PathBuf>,

    /// JSON catalog configuration; overrides --dimension and --metric
    #[arg(short, long, env = "LOUPE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Embedding dimension, when no configuration file is given
    #[arg(long, global = true)]
    pub dimension: Option<usize>,

    /// Similarity metric, when no configuration file is given
    #[arg(long, value_enum, default_value = "cosine", global = true)]
    pub metric: MetricArg,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed table format
    Table,
    /// JSON format
    Json,
}

/// Similarity metric selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MetricArg {
    /// Cosine similarity
    Cosine,
    /// `1 / (1 + euclidean distance)`
    Euclidean,
}

impl From<MetricArg> for loupe::DistanceMetric {
    fn from(metric: MetricArg) -> Self {
        match metric {
            MetricArg::Cosine => Self::Cosine,
            MetricArg::Euclidean => Self::Euclidean,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest embeddings from a JSON Lines file of `{"id": ..., "vector": [...]}`
    Ingest {
        /// Input file; reads stdin when omitted or `-`
        file: Option<PathBuf>,
    },

    /// Find the nearest neighbors of a vector
    Query {
        /// The vector, as a JSON array or comma-separated numbers
        vector: String,

        /// Number of neighbors
        #[arg(short, default_value = "10")]
        k: usize,

        /// Beam width for this query
        #[arg(long)]
        ef: Option<usize>,

        /// Drop results scoring below this
        #[arg(long)]
        min_score: Option<f32>,

        /// Scan every entry instead of searching the index
        #[arg(long)]
        exact: bool,
    },

    /// Soft-delete entries
    Remove {
        /// IDs to remove
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Rebuild the index and purge deleted entries
    Rebuild,

    /// Rebuild only if fragmentation or a failed rebuild calls for it
    Maintain,

    /// Recompute every duplicate group from the current index
    Regroup,

    /// List duplicate groups
    Groups {
        /// Include single-member groups
        #[arg(long)]
        all: bool,
    },

    /// Show the group of one entry
    Group {
        /// Entry ID
        id: String,
    },

    /// Show catalog statistics
    Stats,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("loupe=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let args = CatalogArgs {
        database: cli.database,
        config: cli.config,
        dimension: cli.dimension,
        metric: cli.metric.into(),
    };

    match cli.command {
        Commands::Ingest { file } => ingest::run(&args, file.as_deref(), cli.format),
        Commands::Query { vector, k, ef, min_score, exact } => {
            let options = query::QueryArgs { k, ef, min_score, exact };
            query::run(&args, &vector, options, cli.format)
        }
        Commands::Remove { ids } => remove::run(&args, &ids, cli.format),
        Commands::Rebuild => maintain::rebuild(&args, cli.format),
        Commands::Maintain => maintain::maintain(&args, cli.format),
        Commands::Regroup => maintain::regroup(&args, cli.format),
        Commands::Groups { all } => groups::list(&args, all, cli.format),
        Commands::Group { id } => groups::show(&args, &id, cli.format),
        Commands::Stats => stats::run(&args, cli.format),
    }
}
