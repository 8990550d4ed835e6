//! repotar - repackage code host tarballs without their wrapper directory.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use repotar_telemetry::LogFormat;

mod commands;
mod config_bridge;

use commands::{fetch, resolve, strip};

/// repotar - stream repository archives with the top-level directory removed
#[derive(Parser)]
#[command(name = "repotar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log format: pretty, compact or json (overrides config)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a repository archive and write it without the wrapper directory
    Fetch {
        /// Repository as owner/repo[@ref]
        repo: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write a copy of the output to a temp file
        #[arg(long)]
        debug_dump: bool,
    },

    /// Print the commit a ref points at
    Resolve {
        /// Repository as owner/repo[@ref]
        repo: String,
    },

    /// Repackage a local .tar.gz
    Strip {
        /// Input archive
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read exclusion patterns from this file
        #[arg(long)]
        ignore_file: Option<PathBuf>,

        /// Additional exclusion pattern (repeatable)
        #[arg(short, long = "exclude")]
        excludes: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = repotar_config::Config::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    let config = resolved.config;

    let mut log_config = config_bridge::to_log_config(&config);
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    if let Err(e) = repotar_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
    tracing::debug!(files = ?resolved.loaded_files, "configuration loaded");

    match cli.command {
        Commands::Fetch {
            repo,
            output,
            debug_dump,
        } => {
            fetch::run_fetch(&config, &repo, output.as_deref(), debug_dump).await?;
        },
        Commands::Resolve { repo } => {
            resolve::run_resolve(&config, &repo).await?;
        },
        Commands::Strip {
            input,
            output,
            ignore_file,
            excludes,
        } => {
            strip::run_strip(&input, output.as_deref(), ignore_file.as_deref(), &excludes).await?;
        },
    }

    Ok(())
}
