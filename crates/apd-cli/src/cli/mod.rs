//! CLI for the apd pricing catalog downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use apd_core::config;
use std::path::PathBuf;

use commands::{run_checksum, run_fetch, run_list};

/// Top-level CLI for the apd pricing catalog downloader.
#[derive(Debug, Parser)]
#[command(name = "apd")]
#[command(about = "apd: conditional, integrity-checked AWS pricing catalog downloads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download service catalogs (all services when none are named).
    Fetch {
        /// Service codes to fetch (e.g. AmazonEC2 AmazonS3). Empty = every
        /// service in the offer index.
        services: Vec<String>,

        /// Write catalogs here instead of the configured output_dir.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Ignore stored validators and re-download everything in full.
        #[arg(long)]
        force: bool,
    },

    /// List the service codes published in the offer index.
    List,

    /// Compute SHA-256 of a file (e.g. a downloaded catalog).
    Checksum {
        /// Path to the file.
        path: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                services,
                output_dir,
                force,
            } => run_fetch(cfg, services, output_dir, force).await?,
            CliCommand::List => run_list(cfg).await?,
            CliCommand::Checksum { path } => run_checksum(std::path::Path::new(&path)).await?,
        }

        Ok(())
    }
}
