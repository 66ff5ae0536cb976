//! `rts split` command - shard a large CSV at product-group boundaries

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{format_bytes, parse_size, render_rows};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{split_file, Config, SplitLimit};

#[derive(clap::Args, Debug)]
pub struct SplitArgs {
    /// CSV file to split
    pub input: PathBuf,

    /// Maximum shard size, e.g. 20M (default from config, 20 MiB)
    #[arg(long, value_parser = parse_size, conflicts_with = "records")]
    pub bytes: Option<usize>,

    /// Maximum number of data records per shard
    #[arg(long)]
    pub records: Option<usize>,

    /// Directory for the shards (default: next to the input)
    #[arg(long, short = 'o')]
    pub out_dir: Option<PathBuf>,

    /// Line cap for a single quoted record
    #[arg(long)]
    pub max_record_lines: Option<usize>,

    /// Shard listing format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn run(args: SplitArgs, global: &GlobalOpts) -> Result<()> {
    if !args.input.exists() {
        return Err(miette::miette!("File not found: {}", args.input.display()));
    }

    let config = Config::load_with(global.config.as_deref())?;
    let limit = match (args.records, args.bytes) {
        (Some(records), _) => SplitLimit::Records(records),
        (None, Some(bytes)) => SplitLimit::Bytes(bytes),
        (None, None) => SplitLimit::Bytes(config.split_bytes()),
    };
    let max_record_lines = args.max_record_lines.unwrap_or_else(|| config.max_record_lines());
    let out_dir = args.out_dir.clone().unwrap_or_else(|| {
        args.input
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    });

    if !global.quiet {
        let limit_desc = match limit {
            SplitLimit::Bytes(n) => format_bytes(n),
            SplitLimit::Records(n) => format!("{} records", n),
        };
        eprintln!(
            "{} Splitting {} into shards of at most {}",
            style("→").blue(),
            style(args.input.display()).yellow(),
            style(limit_desc).cyan()
        );
    }

    let report = split_file(&args.input, &out_dir, limit, max_record_lines)?;

    let rows: Vec<Vec<String>> = report
        .shards
        .iter()
        .map(|shard| {
            vec![
                shard.path.display().to_string(),
                shard.groups.to_string(),
                shard.records.to_string(),
                shard.bytes.to_string(),
            ]
        })
        .collect();
    println!(
        "{}",
        render_rows(args.format, &["File", "Groups", "Records", "Bytes"], &rows)
    );

    if !global.quiet {
        eprintln!(
            "{} Wrote {} shard(s) with {} records",
            style("✓").green(),
            report.shards.len(),
            report.total_records()
        );
        if report.oversized_groups > 0 {
            eprintln!(
                "{} {} product group(s) exceed the limit on their own and were written whole",
                style("!").yellow(),
                report.oversized_groups
            );
        }
    }

    Ok(())
}
