use clap::Parser;
use miette::Result;
use rts::cli::{Cli, Commands, GlobalOpts};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(&global);

    match cli.command {
        Commands::Convert(args) => rts::cli::commands::convert::run(args, &global),
        Commands::Split(args) => rts::cli::commands::split::run(args, &global),
        Commands::Merge(args) => rts::cli::commands::merge::run(args, &global),
        Commands::Handle(args) => rts::cli::commands::handle::run(args),
        Commands::Mapping(args) => rts::cli::commands::mapping::run(args, &global),
        Commands::Config(args) => rts::cli::commands::config::run(args, &global),
        Commands::Completions(args) => rts::cli::commands::completions::run(args),
    }
}

/// Diagnostics go to stderr; `RUST_LOG` wins over the verbosity flags
fn init_logging(global: &GlobalOpts) {
    let default_level = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
