//! `rts convert` command - Rakuten export to Shopify import CSV

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::truncate_str;
use crate::cli::GlobalOpts;
use crate::core::{convert_file, Config, ConvertOptions};

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Rakuten RMS item export (CSV)
    pub input: PathBuf,

    /// Shopify CSV to write
    #[arg(long, short = 'o', required_unless_present = "dry_run")]
    pub output: Option<PathBuf>,

    /// Vendor for every product (overrides config)
    #[arg(long)]
    pub vendor: Option<String>,

    /// Base URL for relative image paths (overrides config)
    #[arg(long)]
    pub image_base: Option<String>,

    /// Extra attribute mapping file (overrides config)
    #[arg(long)]
    pub metafield_map: Option<PathBuf>,

    /// Convert and report without writing the output file
    #[arg(long)]
    pub dry_run: bool,

    /// Drop rows with data errors instead of aborting
    #[arg(long)]
    pub skip_errors: bool,
}

pub fn run(args: ConvertArgs, global: &GlobalOpts) -> Result<()> {
    if !args.input.exists() {
        return Err(miette::miette!("File not found: {}", args.input.display()));
    }

    let mut config = Config::load_with(global.config.as_deref())?;
    if args.metafield_map.is_some() {
        config.metafield_map = args.metafield_map.clone();
    }
    let table = config.metafield_table()?;

    let opts = ConvertOptions {
        vendor: args.vendor.clone().unwrap_or_else(|| config.vendor()),
        image_base: args.image_base.clone().or_else(|| config.image_base.clone()),
        encodings: config.encodings(),
        skip_errors: args.skip_errors,
    };

    let output = if args.dry_run { None } else { args.output.as_deref() };

    if !global.quiet {
        println!(
            "{} Converting {}{}",
            style("→").blue(),
            style(args.input.display()).yellow(),
            if args.dry_run { style(" (dry run)").dim().to_string() } else { String::new() }
        );
    }

    let stats = convert_file(&args.input, output, &table, &opts)?;

    if global.quiet {
        return Ok(());
    }

    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!("{}", style("Conversion Summary").bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  Encoding:       {}", style(&stats.encoding).cyan());
    println!("  Rows read:      {}", style(stats.rows_read).cyan());
    println!("  Products:       {}", style(stats.products).green());
    println!("  Variant rows:   {}", style(stats.variants).green());
    println!("  Image rows:     {}", style(stats.image_rows).green());
    if stats.rows_merged > 0 {
        println!("  Rows merged:    {}", style(stats.rows_merged).yellow());
    }
    if stats.rows_dropped > 0 {
        println!("  Rows dropped:   {}", style(stats.rows_dropped).red());
    }
    if stats.mapping.unmapped_count() > 0 {
        println!(
            "  Unmapped attrs: {}",
            style(stats.mapping.unmapped_count()).yellow()
        );
        for (name, count) in stats.mapping.unmapped() {
            println!("    {} {}", style(truncate_str(name, 40)).dim(), style(format!("({}x)", count)).dim());
        }
    }

    println!();
    match output {
        Some(path) => println!(
            "{} Wrote {} rows to {}",
            style("✓").green(),
            stats.rows_written(),
            style(path.display()).yellow()
        ),
        None => println!("{}", style("Dry run complete. No files were written.").yellow()),
    }

    Ok(())
}
