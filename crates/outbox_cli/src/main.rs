//! Outbox CLI
//!
//! Command-line tools for persisted Outbox queues.
//!
//! # Commands
//!
//! - `inspect` - Summarize a queue file
//! - `replay` - Run every queued request through a coordinator
//! - `classify` - Classify a captured server response

mod client;
mod commands;
mod queue_file;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Outbox command-line queue tools.
#[derive(Parser)]
#[command(name = "outbox")]
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
    /// Summarize a queue file
    Inspect {
        /// Path to the queue file (JSON Lines)
        path: PathBuf,

        /// List every entry
        #[arg(short, long)]
        entries: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run every queued request through a coordinator
    Replay {
        /// Path to the queue file (JSON Lines)
        path: PathBuf,

        /// Base url for relative request urls
        #[arg(short, long)]
        base_url: String,

        /// Answer every request from local state
        #[arg(long)]
        offline: bool,

        /// JSON file with local lists for offline reads
        #[arg(short, long)]
        local_state: Option<PathBuf>,

        /// Per-request timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Dry run - leave the queue file unchanged
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Classify a captured server response
    Classify {
        /// HTTP status code
        #[arg(short, long)]
        status: u16,

        /// Response body
        #[arg(short, long, conflicts_with = "body_file")]
        body: Option<String>,

        /// Read the response body from a file
        #[arg(long)]
        body_file: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
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
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect {
            path,
            entries,
            format,
        } => {
            commands::inspect::run(&path, entries, &format)?;
        }
        Commands::Replay {
            path,
            base_url,
            offline,
            local_state,
            timeout,
            dry_run,
        } => {
            commands::replay::run(commands::replay::ReplayOptions {
                path,
                base_url,
                offline,
                local_state,
                timeout_secs: timeout,
                dry_run,
            })?;
        }
        Commands::Classify {
            status,
            body,
            body_file,
            format,
        } => {
            let body = match (body, body_file) {
                (Some(body), _) => body,
                (None, Some(path)) => std::fs::read_to_string(path)?,
                (None, None) => String::new(),
            };
            commands::classify::run(status, &body, &format)?;
        }
        Commands::Version => {
            println!("Outbox CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
