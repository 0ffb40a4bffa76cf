//! Mixdeck CLI
//!
//! Command-line interface for the mixdeck playback engine.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mixdeck::cli::{commands, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    info!("Mixdeck v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Mixdeck v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Simulate(args) => {
            commands::simulate(&args).context("simulation failed")
        }
        Commands::Modes { json } => commands::list_modes(json).context("listing modes"),
        Commands::Profiles { json } => commands::list_profiles(json).context("listing profiles"),
        Commands::Suggest { output, hour, car } => {
            commands::suggest(output, hour, car).context("suggesting a mode")
        }
    }
}
