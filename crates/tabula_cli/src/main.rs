//! Tabula CLI
//!
//! Command-line tools for Tabula table files.
//!
//! # Commands
//!
//! - `inspect` - List the table files under a directory
//! - `dump` - Print the columns and rows of one table file
//! - `clear` - Delete one table file

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Tabula command-line table file tools.
#[derive(Parser)]
#[command(name = "tabula")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the table files under a directory
    Inspect {
        /// Directory holding the table files
        #[arg(short, long)]
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the columns and rows of a table file
    Dump {
        /// The table file
        file: PathBuf,

        /// Serialization format (csv, tsv, json, cbor); taken from the
        /// file extension when omitted
        #[arg(short, long)]
        format: Option<String>,

        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a table file
    Clear {
        /// The table file
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { path, format } => commands::inspect::run(&path, &format)?,
        Commands::Dump { file, format, json } => {
            commands::dump::run(&file, format.as_deref(), json)?;
        }
        Commands::Clear { file } => commands::clear::run(&file)?,
    }

    Ok(())
}
