//! CLI argument definitions using clap
//!
//! - warden config                 # Print the resolved configuration
//! - warden config --format json
//! - warden drill                  # Simulate a provider outage offline

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden - provider resilience layer operator tool")]
#[command(version)]
pub struct Cli {
    /// Path to a TOML or JSON configuration file
    #[arg(long, short = 'c', global = true, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level, overriding the configuration (RUST_LOG wins over both)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the configuration after defaults, file and environment are applied
    Config {
        #[arg(long, value_enum, default_value = "toml")]
        format: OutputFormat,
    },

    /// Run a simulated outage against in-process providers
    Drill(DrillArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Toml,
    Json,
}

#[derive(clap::Args, Clone, Debug)]
pub struct DrillArgs {
    /// Requests to send
    #[arg(long, default_value_t = 12)]
    pub requests: u32,

    /// Requests (from the start) during which the primary is down
    #[arg(long, default_value_t = 5)]
    pub outage: u32,

    /// Simulated seconds between requests
    #[arg(long, default_value_t = 15)]
    pub interval_secs: u64,

    /// Simulated cost of each served request, in USD
    #[arg(long, default_value_t = 0.12)]
    pub cost_usd: f64,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}
