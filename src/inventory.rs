//! Host discovery from the local dynamic inventory
//!
//! The inventory is a YAML document of the form
//!
//! ```yaml
//! pve:
//!   cloud:
//!     example.com:           # cloud domain
//!       pve-cluster-a:       # cluster
//!         pve1:
//!           ansible_host: 10.0.0.11
//! ```
//!
//! Hosts keep their document order, which is also the order in which an
//! online host is preferred.

use crate::net::Reachability;
use crate::service::HostDiscovery;
use crate::types::{CloudInventory, PveHost, TargetPve};
use crate::{PxcError, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use serde_yaml::Mapping;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct InventoryFile {
    pve: Option<PveGroup>,
}

#[derive(Debug, Deserialize)]
struct PveGroup {
    cloud: Option<Mapping>,
}

/// Parsed dynamic inventory
#[derive(Debug, Clone, Default)]
pub struct PveInventory {
    hosts: Vec<PveHost>,
    clouds: Mapping,
}

impl PveInventory {
    pub fn from_yaml(text: &str) -> Result<Self> {
        let file: InventoryFile =
            serde_yaml::from_str(text).map_err(|e| PxcError::Inventory(e.to_string()))?;

        let clouds = match file.pve.and_then(|p| p.cloud) {
            Some(c) => c,
            None => return Ok(Self::default()),
        };

        let mut hosts = Vec::new();
        for (domain, clusters) in &clouds {
            let domain = key_str(domain, "cloud domain")?;
            for (cluster, members) in as_mapping(clusters.clone(), &domain)? {
                let cluster = key_str(&cluster, "cluster")?;
                for (name, vars) in as_mapping(members, &cluster)? {
                    let name = key_str(&name, "host")?;
                    let address = vars
                        .get("ansible_host")
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| name.clone());

                    hosts.push(PveHost {
                        name,
                        address,
                        cluster: cluster.clone(),
                        cloud_domain: domain.clone(),
                    });
                }
            }
        }

        Ok(Self { hosts, clouds })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PxcError::Inventory(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&text)
    }

    pub fn hosts(&self) -> &[PveHost] {
        &self.hosts
    }

    /// Hosts of one cluster, in inventory order
    pub fn cluster_hosts(&self, target: &TargetPve) -> Vec<&PveHost> {
        self.hosts
            .iter()
            .filter(|h| h.cluster == target.cluster && h.cloud_domain == target.cloud_domain)
            .collect()
    }

    /// The part of the inventory that belongs to one cloud domain, in the
    /// same `pve.cloud.<domain>` layout and with all host vars kept
    pub fn cloud_yaml(&self, cloud_domain: &str) -> Result<Option<String>> {
        let Some(clusters) = self.clouds.get(cloud_domain) else {
            return Ok(None);
        };

        let mut cloud = Mapping::new();
        cloud.insert(cloud_domain.into(), clusters.clone());
        let mut pve = Mapping::new();
        pve.insert("cloud".into(), cloud.into());
        let mut root = Mapping::new();
        root.insert("pve".into(), pve.into());

        Ok(Some(serde_yaml::to_string(&root)?))
    }
}

fn key_str(key: &serde_yaml::Value, what: &str) -> Result<String> {
    key.as_str()
        .map(str::to_string)
        .ok_or_else(|| PxcError::Inventory(format!("{} key must be a string: {:?}", what, key)))
}

fn as_mapping(value: serde_yaml::Value, parent: &str) -> Result<Mapping> {
    match value {
        serde_yaml::Value::Mapping(m) => Ok(m),
        serde_yaml::Value::Null => Ok(Mapping::new()),
        other => Err(PxcError::Inventory(format!(
            "expected a mapping under {}, got {:?}",
            parent, other
        ))),
    }
}

/// `HostDiscovery` over the inventory file
///
/// The file is re-read on every call, so `pvcli connect-cluster` updates are
/// picked up without a restart.
pub struct InventoryHostDiscovery {
    path: PathBuf,
    probe: Arc<dyn Reachability>,
    port: u16,
}

impl InventoryHostDiscovery {
    pub fn new(path: impl Into<PathBuf>, probe: Arc<dyn Reachability>, port: u16) -> Self {
        Self {
            path: path.into(),
            probe,
            port,
        }
    }

    /// First host of `target` that answers on the SSH port
    pub async fn first_online(&self, inventory: &PveInventory, target_pve: &str) -> Result<PveHost> {
        let target = TargetPve::parse(target_pve)?;
        let candidates = inventory.cluster_hosts(&target);

        if candidates.is_empty() {
            return Err(PxcError::UnknownTarget {
                cluster: target.cluster,
                cloud_domain: target.cloud_domain,
            });
        }

        let probes = candidates
            .iter()
            .map(|h| self.probe.is_reachable(&h.address, self.port));
        let results = join_all(probes).await;

        for (host, online) in candidates.iter().zip(results) {
            if online {
                return Ok((*host).clone());
            }
            debug!("{} ({}) is offline", host.name, host.address);
        }

        warn!("All {} hosts of {} are offline", candidates.len(), target);
        Err(PxcError::NoOnlineHost(target_pve.to_string()))
    }
}

#[async_trait]
impl HostDiscovery for InventoryHostDiscovery {
    async fn online_host(&self, target_pve: &str) -> Result<PveHost> {
        let inventory = PveInventory::load(&self.path)?;
        self.first_online(&inventory, target_pve).await
    }

    async fn cloud_inventory(&self, target_pve: &str) -> Result<CloudInventory> {
        let target = TargetPve::parse(target_pve)?;
        let inventory = PveInventory::load(&self.path)?;

        if inventory.cluster_hosts(&target).is_empty() {
            return Err(PxcError::UnknownTarget {
                cluster: target.cluster,
                cloud_domain: target.cloud_domain,
            });
        }
        let yaml = inventory
            .cloud_yaml(&target.cloud_domain)?
            .unwrap_or_default();

        Ok(CloudInventory {
            inventory: yaml,
            cloud_domain: target.cloud_domain,
        })
    }
}
