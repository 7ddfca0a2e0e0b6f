//! CLI argument parsing for the swissairdry-worker binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "swissairdry-worker", about = "SwissAirDry backend worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Run database migrations and exit
    Migrate,
    /// Import every CSV file of a directory as one batch
    Import {
        /// Directory containing the CSV exports
        dir: PathBuf,
        /// Import into memory only and print the summary
        #[arg(long)]
        dry_run: bool,
    },
}
