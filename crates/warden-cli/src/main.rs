//! Warden operator CLI
//!
//! Prints the resolved configuration and runs offline failover drills.
//! `.env` files in the working directory are loaded before anything else.

mod args;
mod commands;
mod console;
mod router;

use anyhow::Context;
use args::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use warden_core::WardenConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config =
        WardenConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_logging(&cli, &config);
    tracing::debug!(
        config_path = ?cli.config,
        providers = ?config.failover.providers,
        "Configuration resolved"
    );

    if let Err(error) = router::route(cli, config).await {
        console::CliConsole::new().error(&format!("{:#}", error));
        std::process::exit(1);
    }
    Ok(())
}

fn init_logging(cli: &Cli, config: &WardenConfig) {
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if cli.json_logs || config.logging.format == "json" {
        builder.json().init();
    } else if config.logging.format == "compact" {
        builder.compact().init();
    } else {
        builder.init();
    }
}
