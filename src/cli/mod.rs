//! Autobuy CLI
//!
//! Without `--run-now` the process stays up and places the watchlist's
//! orders once per trading day at the configured time.

pub mod output;

use clap::Parser;
use std::path::PathBuf;

/// Scheduled equity buy orders
#[derive(Parser, Debug, Clone)]
#[command(name = "autobuy")]
#[command(author, version, about = "Places the watchlist's buy orders every trading day", long_about = None)]
pub struct Cli {
    /// Directory holding .env, default.toml and the watchlist
    #[arg(short, long, default_value = "config")]
    pub config: PathBuf,

    /// Directory for rolling log files
    #[arg(short, long, default_value = "logs")]
    pub logs: PathBuf,

    /// Run one batch immediately and exit
    #[arg(long)]
    pub run_now: bool,

    /// Check margins but never send orders
    #[arg(long)]
    pub dry_run: bool,

    /// Print the batch report as JSON
    #[arg(long)]
    pub json: bool,
}
