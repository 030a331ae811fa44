//! CLI implementation using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::adapters::FrameworkKind;

/// impt - Prioritize mutants and drop redundant ones before running them.
#[derive(Parser)]
#[command(name = "impt")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (defaults to the configured one)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Operator history store (overrides `history.path`)
    #[arg(long, global = true)]
    pub history: Option<PathBuf>,

    /// Code metrics table (JSON); source files are analyzed when absent
    #[arg(long, global = true)]
    pub metrics: Option<PathBuf>,

    /// Measured coverage table (JSON, `file:line` -> tests)
    #[arg(long, global = true)]
    pub coverage: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score mutants, remove redundant ones and list the rest by priority
    #[command(alias = "p")]
    Prioritize(PrioritizeArgs),

    /// Score mutants without removing any
    Score(InputArgs),

    /// Explain the score of one mutant
    Explain(ExplainArgs),

    /// Group mutants by file and line proximity
    Clusters(ClustersArgs),

    /// Inspect or update the operator history store
    History(HistoryCommand),
}

#[derive(Args)]
pub struct InputArgs {
    /// Mutants file: a JSON array of mutants, or a framework report with --framework
    pub mutants: PathBuf,

    /// Read the input as a standardized report of this framework
    #[arg(long, value_enum)]
    pub framework: Option<Framework>,
}

#[derive(Args)]
pub struct PrioritizeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Maximum number of mutants to list
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Mutant id
    #[arg(long)]
    pub id: String,
}

#[derive(Args)]
pub struct ClustersArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Largest line gap inside a cluster (defaults to the configured one)
    #[arg(short, long)]
    pub threshold: Option<u32>,
}

#[derive(Args)]
pub struct HistoryCommand {
    #[command(subcommand)]
    pub action: HistoryAction,
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Show per-operator kill rates
    Show,

    /// Fold executed mutants into the store and save it
    Update(InputArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    Text,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Framework {
    Pit,
    Stryker,
}

impl From<Framework> for FrameworkKind {
    fn from(framework: Framework) -> Self {
        match framework {
            Framework::Pit => FrameworkKind::Pit,
            Framework::Stryker => FrameworkKind::Stryker,
        }
    }
}
