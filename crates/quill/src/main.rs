//! quill CLI - entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "quill")]
#[command(version)]
#[command(about = "Novel project file tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a summary of a yWriter 7 project
    Info {
        /// Path to the .yw7 file
        path: String,
    },
    /// Read a yWriter 7 project and re-write it in canonical form
    Convert {
        /// Path to the .yw7 file
        path: String,

        /// Keep the .bak file of the previous version
        #[arg(long)]
        keep_backup: bool,
    },
    /// Remove custom fields and language spans, then re-write the project
    Purge {
        /// Path to the .yw7 file
        path: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info { path } => commands::info(&path),
        Commands::Convert { path, keep_backup } => commands::convert(&path, keep_backup),
        Commands::Purge { path } => commands::purge(&path),
    }
}
