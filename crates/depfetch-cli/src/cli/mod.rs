//! CLI for the depfetch dependency downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use depfetch_core::config;
use depfetch_core::manifest::{self, DEFAULT_MANIFEST};
use std::path::PathBuf;

use commands::{run_fetch, run_manifest, run_status};

/// Top-level CLI for the depfetch dependency downloader.
#[derive(Debug, Parser)]
#[command(name = "depfetch")]
#[command(about = "depfetch: resumable downloader for project dependencies", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every enabled entry of the manifest. Ctrl+C cancels; partial
    /// files are kept and resumed on the next run.
    Run {
        /// Manifest file.
        #[arg(long, default_value = DEFAULT_MANIFEST, value_name = "PATH")]
        manifest: PathBuf,
        /// Override a target folder from the manifest (repeatable).
        #[arg(long = "target", value_name = "NAME=DIR", value_parser = parse_target)]
        targets: Vec<(String, PathBuf)>,
        /// Keep archives as downloaded instead of extracting them.
        #[arg(long)]
        no_extract: bool,
    },

    /// Download a single file by its identifier.
    Fetch {
        /// Provider identifier of the file.
        id: String,
        /// Name on disk; learned from the server when omitted.
        #[arg(long)]
        filename: Option<String>,
        /// Destination folder (default: current directory).
        #[arg(long, value_name = "DIR")]
        dest: Option<PathBuf>,
        /// Keep the archive as downloaded instead of extracting it.
        #[arg(long)]
        no_extract: bool,
    },

    /// Show what is on disk for each manifest entry.
    Status {
        /// Manifest file.
        #[arg(long, default_value = DEFAULT_MANIFEST, value_name = "PATH")]
        manifest: PathBuf,
        /// Override a target folder from the manifest (repeatable).
        #[arg(long = "target", value_name = "NAME=DIR", value_parser = parse_target)]
        targets: Vec<(String, PathBuf)>,
    },
}

fn parse_target(s: &str) -> Result<(String, PathBuf), String> {
    manifest::parse_target_override(s).map_err(|e| e.to_string())
}

impl CliCommand {
    /// Parse arguments, run the command and return the process exit code.
    pub fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                manifest,
                targets,
                no_extract,
            } => {
                cfg.extract_archives &= !no_extract;
                run_manifest(&cfg, &manifest, &targets)
            }
            CliCommand::Fetch {
                id,
                filename,
                dest,
                no_extract,
            } => {
                cfg.extract_archives &= !no_extract;
                let dest = match dest {
                    Some(d) => d,
                    None => std::env::current_dir()?,
                };
                run_fetch(&cfg, id, filename, &dest)
            }
            CliCommand::Status { manifest, targets } => {
                run_status(&manifest, &targets)?;
                Ok(0)
            }
        }
    }
}
