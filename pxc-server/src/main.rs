//! pxc-server - gRPC endpoint for Proxmox cloud lookups
//!
//! Resolves a target PVE cluster to a reachable host, reads the cloud
//! environment from it and hands out stack kubeconfigs. Runs until
//! interrupted, or until the parent process exits when `--parent-pid` is set.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use pxc::{CloudResolver, ResolverConfig};
use pxc_server::grpc_server::{start_server, Listen, DEFAULT_LISTEN_ADDR};
use pxc_server::parent;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pxc-server")]
#[command(about = "gRPC endpoint for Proxmox cloud lookups", long_about = None)]
#[command(version)]
struct Args {
    /// TCP address to listen on
    #[arg(short, long, env = "PXC_LISTEN", default_value = DEFAULT_LISTEN_ADDR)]
    listen: SocketAddr,

    /// Listen on this unix socket instead of TCP
    #[arg(long, env = "PXC_UNIX_SOCKET", conflicts_with = "parent_pid")]
    unix_socket: Option<PathBuf>,

    /// Listen on /tmp/pc-rpc-<pid>.sock and exit with this process
    #[arg(long, env = "PXC_PARENT_PID")]
    parent_pid: Option<u32>,

    /// Resolver config file (YAML)
    #[arg(short, long, env = "PXC_CONFIG")]
    config: Option<PathBuf>,

    /// Inventory file, overrides the config file
    #[arg(long, env = "PXC_INVENTORY")]
    inventory: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    info!("pxc-server v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config =
        ResolverConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(inventory) = args.inventory {
        config.inventory_path = inventory;
    }
    info!("Using inventory {}", config.inventory_path.display());

    let listen = match (args.unix_socket, args.parent_pid) {
        (Some(path), _) => Listen::Unix(path),
        (None, Some(pid)) => Listen::for_parent(pid),
        (None, None) => Listen::Tcp(args.listen),
    };

    let resolver = CloudResolver::from_config(&config);
    start_server(resolver, listen, shutdown_signal(args.parent_pid)).await?;

    info!("pxc-server stopped");
    Ok(())
}

async fn shutdown_signal(parent_pid: Option<u32>) {
    let parent_exit = async {
        match parent_pid {
            Some(pid) => parent::wait_for_exit(pid).await,
            None => std::future::pending().await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
        _ = terminate => info!("Terminate signal received"),
        _ = parent_exit => {}
    }
}
