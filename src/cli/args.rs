//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, config::ConfigArgs, convert::ConvertArgs, handle::HandleArgs,
    mapping::MappingArgs, merge::MergeArgs, split::SplitArgs,
};

#[derive(Parser)]
#[command(name = "rts")]
#[command(author, version, about = "Rakuten to Shopify CSV toolkit")]
#[command(long_about = "Converts Rakuten RMS item exports into Shopify product-import CSVs, and splits or merges large CSV files without breaking multi-line records.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Config file layered over the global and local ones
    #[arg(long, global = true, env = "RTS_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a Rakuten item export into a Shopify product CSV
    Convert(ConvertArgs),

    /// Split a large CSV into shards without breaking product groups
    Split(SplitArgs),

    /// Merge CSV shards back into one file
    Merge(MergeArgs),

    /// Show the handle and variant derived from product codes
    Handle(HandleArgs),

    /// Show the attribute to metafield mapping table
    Mapping(MappingArgs),

    /// Show configuration values and file paths
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Output format for listing commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Markdown table for humans
    #[default]
    Table,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
}
