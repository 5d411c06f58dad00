use crate::k8s::types::{ClusterInfo, NodeInfo};
use crate::{PxcError, Result};
use k8s_openapi::api::core::v1::Node;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tracing::{debug, info};

/// Client for a stack's API server, built from a fetched kubeconfig
pub struct K8sClient {
    client: Client,
}

impl K8sClient {
    pub async fn from_kubeconfig_yaml(yaml: &str) -> Result<Self> {
        debug!("Initializing Kubernetes client from kubeconfig");

        let kubeconfig = Kubeconfig::from_yaml(yaml)
            .map_err(|e| PxcError::Kubeconfig(format!("Failed to parse kubeconfig: {}", e)))?;

        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| PxcError::Kubeconfig(format!("Failed to load kubeconfig: {}", e)))?;

        let client = Client::try_from(config).map_err(|e| {
            PxcError::Kubernetes(format!("Failed to create K8s client: {}", e))
        })?;

        Ok(Self { client })
    }

    pub fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    pub async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        let nodes = self
            .nodes()
            .list(&Default::default())
            .await
            .map_err(|e| PxcError::Kubernetes(format!("Failed to list nodes: {}", e)))?;

        Ok(nodes.items.iter().map(NodeInfo::from_k8s_node).collect())
    }

    /// Connect, read the server version and list nodes
    pub async fn cluster_info(&self) -> Result<ClusterInfo> {
        let version = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| PxcError::Kubernetes(format!("Failed to reach API server: {}", e)))?;

        info!("Connected to Kubernetes {}", version.git_version);

        Ok(ClusterInfo {
            server_version: version.git_version,
            platform: version.platform,
            nodes: self.list_nodes().await?,
        })
    }
}
