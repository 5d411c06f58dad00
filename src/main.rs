use anyhow::{Context, Result};
use clap::Parser;
use pxc::cli::{commands, Cli};
use pxc::ResolverConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));

    // stdout carries kubeconfigs and vars, keep logs on stderr
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting pxc v{}", env!("CARGO_PKG_VERSION"));

    let mut config =
        ResolverConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(inventory) = cli.inventory {
        config.inventory_path = inventory;
    }

    let command = cli
        .command
        .context("No command specified. Use --help for usage information.")?;
    commands::handle_command(command, &config)
        .await
        .context("Command failed")?;

    Ok(())
}
