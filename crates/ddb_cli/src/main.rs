//! DDB CLI
//!
//! Command-line tools for DDB stores.
//!
//! # Commands
//!
//! - `serve` - Serve the store over HTTP
//! - `inspect` - Display record counts and file size
//! - `verify` - Check the store file for structural problems
//! - `compact` - Move records into holes and shrink the file
//! - `reset` - Wipe the store

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use ddb_core::DEFAULT_STORE_PATH;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// DDB command-line tools.
#[derive(Parser)]
#[command(name = "ddb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file
    #[arg(global = true, short, long, default_value = DEFAULT_STORE_PATH)]
    path: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the store over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Largest accepted request body in bytes
        #[arg(long)]
        max_body_size: Option<usize>,

        /// Sync the file after every write
        #[arg(long)]
        sync: bool,
    },

    /// Display record counts and file size
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check the store file for structural problems
    Verify,

    /// Move records into holes and shrink the file
    Compact {
        /// Dry run - show what would be done
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Wipe the store and restart identifiers at 1
    Reset {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            host,
            port,
            max_body_size,
            sync,
        } => {
            commands::serve::run(&cli.path, &host, port, max_body_size, sync)?;
        }
        Commands::Inspect { format } => {
            commands::inspect::run(&cli.path, format)?;
        }
        Commands::Verify => {
            commands::verify::run(&cli.path)?;
        }
        Commands::Compact { dry_run } => {
            commands::compact::run(&cli.path, dry_run)?;
        }
        Commands::Reset { yes } => {
            commands::reset::run(&cli.path, yes)?;
        }
        Commands::Version => {
            println!("DDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("DDB Core v{}", ddb_core::VERSION);
        }
    }

    Ok(())
}
