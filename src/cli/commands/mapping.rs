//! `rts mapping` command - list the effective attribute mapping

use miette::Result;

use crate::cli::helpers::render_rows;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct MappingArgs {
    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn run(args: MappingArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load_with(global.config.as_deref())?;
    let table = config.metafield_table()?;

    let rows: Vec<Vec<String>> = table
        .iter()
        .map(|(attribute, rule)| {
            vec![
                attribute.to_string(),
                rule.column.key.to_string(),
                rule.class.as_str().to_string(),
                rule.column.header.to_string(),
            ]
        })
        .collect();

    println!(
        "{}",
        render_rows(args.format, &["Attribute", "Key", "Class", "Column"], &rows)
    );
    Ok(())
}
