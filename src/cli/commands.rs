use crate::cli::Commands;
use crate::k8s::K8sClient;
use crate::kubeconfig::write_kubeconfig;
use crate::{CloudResolver, PxcError, ResolverConfig, Result};
use std::path::PathBuf;
use tracing::info;

pub async fn handle_command(command: Commands, config: &ResolverConfig) -> Result<()> {
    match command {
        Commands::Kubeconfig {
            target_pve,
            stack_name,
            output,
        } => handle_kubeconfig(config, &target_pve, &stack_name, output).await,
        Commands::ClusterVars { target_pve } => handle_cluster_vars(config, &target_pve).await,
        Commands::Host { target_pve, json } => handle_host(config, &target_pve, json).await,
        Commands::Inventory { target_pve } => handle_inventory(config, &target_pve).await,
        Commands::Verify { file } => handle_verify(file).await,
    }
}

async fn handle_kubeconfig(
    config: &ResolverConfig,
    target_pve: &str,
    stack_name: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let kubeconfig = CloudResolver::from_config(config)
        .master_kubeconfig(target_pve, stack_name)
        .await?;

    match output {
        Some(path) => {
            write_kubeconfig(&path, &kubeconfig)?;
            info!("Kubeconfig written to {}", path.display());
        }
        None => print!("{}", kubeconfig),
    }
    Ok(())
}

async fn handle_cluster_vars(config: &ResolverConfig, target_pve: &str) -> Result<()> {
    let vars = CloudResolver::from_config(config)
        .cluster_vars(target_pve)
        .await?;
    print!("{}", vars);
    Ok(())
}

async fn handle_host(config: &ResolverConfig, target_pve: &str, json: bool) -> Result<()> {
    let host = CloudResolver::from_config(config)
        .proxmox_host(target_pve)
        .await?;

    if json {
        let out = serde_json::to_string_pretty(&host)
            .map_err(|e| PxcError::Config(format!("Failed to encode host: {}", e)))?;
        println!("{}", out);
    } else {
        println!("{} ({})", host.address, host.name);
    }
    Ok(())
}

async fn handle_inventory(config: &ResolverConfig, target_pve: &str) -> Result<()> {
    let cloud = CloudResolver::from_config(config)
        .pve_inventory(target_pve)
        .await?;
    info!("Inventory of cloud domain {}", cloud.cloud_domain);
    print!("{}", cloud.inventory);
    Ok(())
}

async fn handle_verify(file: PathBuf) -> Result<()> {
    let yaml = std::fs::read_to_string(&file)?;
    let info = K8sClient::from_kubeconfig_yaml(&yaml)
        .await?
        .cluster_info()
        .await?;

    println!("Server version: {} ({})", info.server_version, info.platform);
    println!("{:<30} {:<8} {:<14} ROLES", "NODE", "READY", "KUBELET");
    for node in info.nodes {
        println!(
            "{:<30} {:<8} {:<14} {}",
            node.name,
            if node.ready { "True" } else { "False" },
            node.kubelet_version,
            if node.roles.is_empty() {
                "<none>".to_string()
            } else {
                node.roles.join(",")
            }
        );
    }
    Ok(())
}
