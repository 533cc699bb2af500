use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Streaming analysis conversations over a shared event channel")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Replay a JSONL script of operations and channel events
    Replay {
        /// Script path, one operation or event per line
        script: PathBuf,

        /// UI surface the session belongs to
        #[arg(long, default_value = "default")]
        panel: String,

        /// Configuration file (defaults to ~/.parley/config.json when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Append the resulting history to the panel's history file
        #[arg(long)]
        save: bool,
    },

    /// View saved analysis history
    History {
        /// Only this panel's history
        #[arg(long)]
        panel: Option<String>,

        /// Show statistics summary
        #[arg(long)]
        stats: bool,
    },

    /// Print version information
    Version,
}
