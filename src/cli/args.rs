//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    brands::BrandsArgs, build::BuildArgs, compare::CompareArgs, completions::CompletionsArgs,
    coverage::CoverageArgs, history::HistoryArgs, init::InitArgs, periods::PeriodsArgs,
    show::ShowArgs,
};

#[derive(Parser)]
#[command(name = "bqt")]
#[command(author, version, about = "Brand Quarter Toolkit")]
#[command(long_about = "Link a brand registry to quarterly metric snapshots, then query any brand's history across quarters.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (info-level logs on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Workspace root (default: auto-detect by finding .bqt/)
    #[arg(long, short = 'w', global = true, env = "BQT_WORKSPACE")]
    pub workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new BQT workspace
    Init(InitArgs),

    /// Build period documents from the quarterly source files
    Build(BuildArgs),

    /// List the periods in the index
    Periods(PeriodsArgs),

    /// Show a brand's metrics across every period with data
    History(HistoryArgs),

    /// Show a brand's metrics for one period
    Show(ShowArgs),

    /// Compare a brand's metrics side by side across periods
    Compare(CompareArgs),

    /// Report how many periods carry data for a brand
    Coverage(CoverageArgs),

    /// List registry brands, or the brands present in one period
    Brands(BrandsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Auto,
    /// JSON format (for programming)
    Json,
    /// Tab-separated values (for piping)
    Tsv,
    /// Markdown tables
    Md,
    /// Just IDs or period keys, one per line
    Id,
}
