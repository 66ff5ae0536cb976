//! `rts handle` command - show what the deriver makes of product codes

use miette::Result;

use crate::cli::helpers::render_rows;
use crate::cli::OutputFormat;
use crate::core::derive_handle;

#[derive(clap::Args, Debug)]
pub struct HandleArgs {
    /// Product codes (e.g. sake-01-6s)
    #[arg(required = true)]
    pub codes: Vec<String>,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn run(args: HandleArgs) -> Result<()> {
    let rows: Vec<Vec<String>> = args
        .codes
        .iter()
        .map(|code| {
            let derived = derive_handle(code);
            vec![
                derived.code,
                derived.handle,
                derived.kind.as_str().to_string(),
                derived.sort_position.to_string(),
                derived.option_value,
            ]
        })
        .collect();

    println!(
        "{}",
        render_rows(
            args.format,
            &["Code", "Handle", "Kind", "Position", "Option Value"],
            &rows
        )
    );
    Ok(())
}
