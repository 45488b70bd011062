use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt;
use std::path::PathBuf;

#[derive(Parser, Clone)]
#[clap(
    name = "metalearn",
    about = "Metalearning analyses over a dump of pipeline runs",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    #[clap(long, global = true)]
    pub config: Option<String>,
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Load the dump, resolve every reference and print what was found
    Extract,

    /// Run a corpus-wide aggregation, reusing a cached result when one exists
    Aggregate(AggregateArgs),

    /// Print the resolved configuration
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct AggregateArgs {
    #[clap(value_enum)]
    pub kind: AggregationKind,

    /// Recompute even if a cached result exists
    #[clap(long)]
    pub refresh: bool,

    /// Debug logging, and list every reported entry
    #[clap(long, short)]
    pub verbose: bool,

    /// Also write the JSON result to this file
    #[clap(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationKind {
    /// One-step primitive substitutions between runs of the same context
    PrimitivePairs,
    /// Distinct pipelines reaching the same score on the same dataset
    DuplicatePipelines,
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationKind::PrimitivePairs => write!(f, "primitive_pairs"),
            AggregationKind::DuplicatePipelines => write!(f, "duplicate_pipelines"),
        }
    }
}
