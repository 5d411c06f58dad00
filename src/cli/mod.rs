pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pxc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve Proxmox cloud environments and fetch cluster kubeconfigs", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, env = "PXC_CONFIG", help = "Resolver config file (YAML)")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, env = "PXC_INVENTORY", help = "Inventory file")]
    pub inventory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Print the admin kubeconfig of a stack")]
    Kubeconfig {
        #[arg(short, long, help = "Target PVE cluster (cluster.cloud-domain)")]
        target_pve: String,

        #[arg(short, long, help = "Kubernetes stack name")]
        stack_name: String,

        #[arg(short, long, help = "Write to file instead of stdout")]
        output: Option<PathBuf>,
    },
    #[command(about = "Print the cluster vars of a target")]
    ClusterVars {
        #[arg(short, long, help = "Target PVE cluster (cluster.cloud-domain)")]
        target_pve: String,
    },
    #[command(about = "Print the first reachable Proxmox host of a target")]
    Host {
        #[arg(short, long, help = "Target PVE cluster (cluster.cloud-domain)")]
        target_pve: String,

        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    #[command(about = "Print the inventory of the target's cloud domain")]
    Inventory {
        #[arg(short, long, help = "Target PVE cluster (cluster.cloud-domain)")]
        target_pve: String,
    },
    #[command(about = "Connect with a kubeconfig and print cluster information")]
    Verify {
        #[arg(help = "Kubeconfig file")]
        file: PathBuf,
    },
}
