use k8s_openapi::api::core::v1::Node;
use serde::{Deserialize, Serialize};

const ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub kubelet_version: String,
    pub ready: bool,
    pub roles: Vec<String>,
}

impl NodeInfo {
    pub fn from_k8s_node(node: &Node) -> Self {
        let status = node.status.as_ref();

        let ready = status
            .and_then(|s| s.conditions.as_ref())
            .and_then(|conds| conds.iter().find(|c| c.type_ == "Ready"))
            .map(|c| c.status == "True")
            .unwrap_or(false);

        let mut roles: Vec<String> = node
            .metadata
            .labels
            .as_ref()
            .map(|labels| {
                labels
                    .keys()
                    .filter_map(|k| k.strip_prefix(ROLE_LABEL_PREFIX))
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        roles.sort();

        Self {
            name: node.metadata.name.clone().unwrap_or_default(),
            kubelet_version: status
                .and_then(|s| s.node_info.as_ref())
                .map(|i| i.kubelet_version.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            ready,
            roles,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub server_version: String,
    pub platform: String,
    pub nodes: Vec<NodeInfo>,
}
