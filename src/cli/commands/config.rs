//! `rts config` command - inspect configuration
//!
//! Configuration is layered: global file, `./rts.yaml`, `--config`, then
//! `RTS_*` environment variables. Command-line flags override all of them.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::config::LOCAL_CONFIG_FILE;
use crate::core::Config;

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommands>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration as YAML (default)
    Show(ShowArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("vendor", "Vendor written on every product (env RTS_VENDOR)"),
    ("image_base", "Base URL for relative image paths (env RTS_IMAGE_BASE)"),
    ("split_bytes", "Shard size for `rts split` in bytes (env RTS_SPLIT_BYTES)"),
    ("max_record_lines", "Line cap for one quoted record"),
    ("encodings", "Input decode order, e.g. [utf-8, cp932]"),
    ("metafield_map", "YAML file with extra attribute mappings"),
];

/// Run a config subcommand
pub fn run(args: ConfigArgs, global: &GlobalOpts) -> Result<()> {
    match args.command.unwrap_or(ConfigCommands::Show(ShowArgs { key: None })) {
        ConfigCommands::Show(show) => run_show(show, global),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let config = Config::load_with(global.config.as_deref())?.resolved();

    if let Some(key) = &args.key {
        return match get_config_value(&config, key) {
            Some(value) => {
                println!("{}", value);
                Ok(())
            }
            None if VALID_KEYS.iter().any(|(k, _)| *k == key.as_str()) => {
                Err(miette::miette!("Key '{}' is not set", key))
            }
            None => Err(miette::miette!(
                "Unknown key '{}'. Run 'rts config keys' for the list",
                key
            )),
        };
    }

    let yaml = serde_yml::to_string(&config).into_diagnostic()?;
    print!("{}", yaml);
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    println!("{}", style("Configuration file paths (in priority order):").bold());
    println!();

    match Config::global_config_path() {
        Some(path) => print_path("Global:", &path),
        None => println!(
            "  {:<9} {}",
            style("Global:").cyan(),
            style("(no home directory)").dim()
        ),
    }
    print_path("Local:", Path::new(LOCAL_CONFIG_FILE));
    if let Some(path) = &global.config {
        print_path("Explicit:", path);
    }

    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<18} {}", style(key).cyan(), style(description).dim());
    }

    Ok(())
}

fn print_path(label: &str, path: &Path) {
    let state = if path.exists() {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!("  {:<9} {} {}", style(label).cyan(), path.display(), state);
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "vendor" => config.vendor.clone(),
        "image_base" => config.image_base.clone(),
        "split_bytes" => config.split_bytes.map(|n| n.to_string()),
        "max_record_lines" => config.max_record_lines.map(|n| n.to_string()),
        "encodings" => config.encodings.as_ref().map(|list| list.join(", ")),
        "metafield_map" => config
            .metafield_map
            .as_ref()
            .map(|p| p.display().to_string()),
        _ => None,
    }
}
