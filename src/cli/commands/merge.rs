//! `rts merge` command - concatenate shards under one header

use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::helpers::format_bytes;
use crate::cli::GlobalOpts;
use crate::core::shard::collect_inputs;
use crate::core::{merge_files, Config};

#[derive(clap::Args, Debug)]
pub struct MergeArgs {
    /// CSV files or directories of CSV files, merged in the given order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Merged CSV to write
    #[arg(long, short = 'o')]
    pub output: PathBuf,

    /// Line cap for a single quoted record
    #[arg(long)]
    pub max_record_lines: Option<usize>,
}

pub fn run(args: MergeArgs, global: &GlobalOpts) -> Result<()> {
    for input in &args.inputs {
        if !input.exists() {
            return Err(miette::miette!("File not found: {}", input.display()));
        }
    }

    let config = Config::load_with(global.config.as_deref())?;
    let max_record_lines = args.max_record_lines.unwrap_or_else(|| config.max_record_lines());

    // a rerun must not read its own previous output
    let files: Vec<PathBuf> = collect_inputs(&args.inputs)
        .into_iter()
        .filter(|p| !same_file(p, &args.output))
        .collect();

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).into_diagnostic()?;
    }

    if !global.quiet {
        println!(
            "{} Merging {} file(s) into {}",
            style("→").blue(),
            style(files.len()).cyan(),
            style(args.output.display()).yellow()
        );
    }

    let report = merge_files(&files, &args.output, max_record_lines)?;

    if !global.quiet {
        println!(
            "{} Merged {} records from {} file(s) ({})",
            style("✓").green(),
            style(report.records).cyan(),
            report.files,
            format_bytes(report.bytes)
        );
    }

    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
