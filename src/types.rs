use crate::{PxcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// A target identifier such as `pve-cluster-a.example.com`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPve {
    pub cluster: String,
    pub cloud_domain: String,
}

impl TargetPve {
    pub fn parse(target: &str) -> Result<Self> {
        match target.trim().split_once('.') {
            Some((cluster, domain)) if !cluster.is_empty() && !domain.is_empty() => Ok(Self {
                cluster: cluster.to_string(),
                cloud_domain: domain.to_string(),
            }),
            _ => Err(PxcError::InvalidTarget(target.to_string())),
        }
    }
}

impl fmt::Display for TargetPve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.cluster, self.cloud_domain)
    }
}

/// A Proxmox host from the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PveHost {
    pub name: String,
    pub address: String,
    pub cluster: String,
    pub cloud_domain: String,
}

/// Inventory of one cloud domain, as YAML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudInventory {
    pub inventory: String,
    pub cloud_domain: String,
}

/// Cluster vars document stored on the Proxmox cluster
///
/// The raw text is kept so it can be handed out unchanged.
#[derive(Debug, Clone)]
pub struct ClusterVars {
    raw: String,
    values: serde_yaml::Mapping,
}

impl ClusterVars {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let values: serde_yaml::Mapping = match serde_yaml::from_str(&raw)? {
            serde_yaml::Value::Mapping(m) => m,
            _ => return Err(PxcError::ClusterVars("expected a YAML mapping".to_string())),
        };

        let vars = Self { raw, values };
        if vars.get_str("pve_cloud_domain").is_none() {
            return Err(PxcError::ClusterVars(
                "missing string key pve_cloud_domain".to_string(),
            ));
        }
        Ok(vars)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    pub fn cloud_domain(&self) -> &str {
        // presence checked in parse
        self.get_str("pve_cloud_domain").unwrap_or_default()
    }

    /// Version of the cloud tooling installed on the cluster, if recorded
    ///
    /// Only string values count: an unquoted `0.10` is a YAML float and
    /// would read back as `0.1`.
    pub fn cloud_version(&self) -> Option<String> {
        match self.get("pve_cloud_version")? {
            serde_yaml::Value::String(s) => Some(s.clone()),
            other => {
                warn!("Ignoring non-string pve_cloud_version {:?}", other);
                None
            }
        }
    }
}

/// Everything environment resolution learns about a cloud
#[derive(Clone)]
pub struct CloudEnv {
    pub host: PveHost,
    pub cluster_vars: ClusterVars,
    pub patroni_pass: String,
    pub bind_internal_key: String,
}

impl fmt::Debug for CloudEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudEnv")
            .field("host", &self.host)
            .field("cloud_domain", &self.cluster_vars.cloud_domain())
            .field("patroni_pass", &"<redacted>")
            .field("bind_internal_key", &"<redacted>")
            .finish()
    }
}
