mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so replay output stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => commands::init::run(force),
        Commands::Replay {
            script,
            panel,
            config,
            save,
        } => commands::replay::run(&script, &panel, config.as_deref(), save),
        Commands::History { panel, stats } => commands::history::run(panel.as_deref(), stats),
        Commands::Version => commands::version::run(),
    }
}
