//! Command routing logic for CLI

use crate::args::{Cli, Commands};
use crate::commands;
use warden_core::WardenConfig;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli, config: WardenConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Config { format } => commands::config::show(&config, format),
        Commands::Drill(args) => commands::drill::run(config, &args).await,
    }
}
