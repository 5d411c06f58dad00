//! pxcctl - client for the pxc gRPC endpoint
//!
//! Commands:
//! - `pxcctl kubeconfig` - Fetch the admin kubeconfig of a stack
//! - `pxcctl cluster-vars` - Print the cluster vars of a target
//! - `pxcctl host` - Print the reachable Proxmox host of a target
//! - `pxcctl inventory` - Print the inventory of a target's cloud domain
//! - `pxcctl health` - Check the endpoint (and optionally a target)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pxc::kubeconfig::write_kubeconfig;
use pxc_proto::{
    CloudServiceClient, GetClusterVarsRequest, GetKubeconfigRequest, GetProxmoxHostRequest,
    GetPveInventoryRequest, HealthCheckRequest, HealthClient, ServingStatus,
};
use std::path::PathBuf;
use tonic::transport::Channel;

#[derive(Parser)]
#[command(name = "pxcctl")]
#[command(about = "Client for the pxc gRPC endpoint", long_about = None)]
#[command(version)]
struct Cli {
    /// Endpoint address (http://host:port)
    #[arg(short, long, env = "PXC_SERVER", default_value = "http://localhost:50051", global = true)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the admin kubeconfig of a stack
    Kubeconfig {
        /// Target PVE cluster (cluster.cloud-domain)
        #[arg(short, long)]
        target_pve: String,

        /// Kubernetes stack name
        #[arg(short = 'n', long)]
        stack_name: String,

        /// Write to file (mode 0600) instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the cluster vars of a target
    ClusterVars {
        /// Target PVE cluster (cluster.cloud-domain)
        #[arg(short, long)]
        target_pve: String,
    },
    /// Print the reachable Proxmox host of a target
    Host {
        /// Target PVE cluster (cluster.cloud-domain)
        #[arg(short, long)]
        target_pve: String,
    },
    /// Print the inventory of a target's cloud domain
    Inventory {
        /// Target PVE cluster (cluster.cloud-domain)
        #[arg(short, long)]
        target_pve: String,
    },
    /// Check the endpoint, and the target's version when given
    Health {
        /// Target PVE cluster (cluster.cloud-domain)
        #[arg(short, long, default_value = "")]
        target_pve: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Kubeconfig {
            target_pve,
            stack_name,
            output,
        } => {
            get_kubeconfig(&cli.server, target_pve, stack_name, output).await?;
        }
        Commands::ClusterVars { target_pve } => {
            get_cluster_vars(&cli.server, target_pve).await?;
        }
        Commands::Host { target_pve } => {
            get_host(&cli.server, target_pve).await?;
        }
        Commands::Inventory { target_pve } => {
            get_inventory(&cli.server, target_pve).await?;
        }
        Commands::Health { target_pve } => {
            check_health(&cli.server, target_pve).await?;
        }
    }

    Ok(())
}

async fn connect(server: &str) -> Result<CloudServiceClient<Channel>> {
    CloudServiceClient::connect(server.to_string())
        .await
        .with_context(|| format!("Failed to connect to {}", server))
}

async fn get_kubeconfig(
    server: &str,
    target_pve: String,
    stack_name: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut client = connect(server).await?;

    let response = client
        .get_master_kubeconfig(GetKubeconfigRequest {
            target_pve,
            stack_name,
        })
        .await?
        .into_inner();

    match output {
        Some(path) => {
            write_kubeconfig(&path, &response.config)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Kubeconfig written to {}", path.display());
        }
        None => print!("{}", response.config),
    }

    Ok(())
}

async fn get_cluster_vars(server: &str, target_pve: String) -> Result<()> {
    let mut client = connect(server).await?;

    let response = client
        .get_cluster_vars(GetClusterVarsRequest { target_pve })
        .await?
        .into_inner();

    print!("{}", response.vars);
    Ok(())
}

async fn get_host(server: &str, target_pve: String) -> Result<()> {
    let mut client = connect(server).await?;

    let response = client
        .get_proxmox_host(GetProxmoxHostRequest { target_pve })
        .await?
        .into_inner();

    println!("{}", response.pve_host);
    Ok(())
}

async fn get_inventory(server: &str, target_pve: String) -> Result<()> {
    let mut client = connect(server).await?;

    let response = client
        .get_pve_inventory(GetPveInventoryRequest { target_pve })
        .await?
        .into_inner();

    eprintln!("Cloud domain: {}", response.cloud_domain);
    print!("{}", response.inventory);
    Ok(())
}

async fn check_health(server: &str, target_pve: String) -> Result<()> {
    let mut client = HealthClient::connect(server.to_string())
        .await
        .with_context(|| format!("Failed to connect to {}", server))?;

    let response = client
        .check(HealthCheckRequest { target_pve })
        .await?
        .into_inner();

    println!("Endpoint:  {}", server);
    println!("Status:    {}", status_label(response.status()));
    if !response.error_message.is_empty() {
        println!("Message:   {}", response.error_message);
    }

    if response.status() != ServingStatus::Serving {
        anyhow::bail!("endpoint is not serving");
    }
    Ok(())
}

fn status_label(status: ServingStatus) -> &'static str {
    match status {
        ServingStatus::Serving => "SERVING",
        ServingStatus::Missmatch => "MISSMATCH",
        ServingStatus::Unknown => "UNKNOWN",
    }
}
