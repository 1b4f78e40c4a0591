//! Command-line interface definitions.

pub mod run;
pub mod status;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gavel - auction prediction settlement orchestrator.
#[derive(Parser, Debug)]
#[command(name = "gavel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute the next pending settlement steps for an auction
    Run(RunArgs),

    /// Report the persisted settlement state for an auction
    Status(StatusArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Auction to settle
    #[arg(long)]
    pub auction: u64,

    /// Override log level (debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Use JSON log format instead of pretty
    #[arg(long)]
    pub json_logs: bool,
}

/// Arguments for the `status` subcommand.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Auction to inspect
    #[arg(long)]
    pub auction: u64,
}
