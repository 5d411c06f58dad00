//! Resolver configuration
//!
//! Loaded from an optional YAML file; every field has a default so an empty
//! file (or no file at all) yields a working configuration.

use crate::{PxcError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the dynamic inventory written by `pvcli connect-cluster`
pub const DEFAULT_INVENTORY_FILE: &str = ".pve-cloud-dyn-inv.yaml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Path to the dynamic inventory
    pub inventory_path: PathBuf,

    /// SSH user for Proxmox hosts
    pub pve_user: String,

    /// SSH user for Kubernetes control-plane masters
    pub master_user: String,

    /// Port probed for reachability and used for SSH
    pub ssh_port: u16,

    /// Connect timeout for probes and SSH, in seconds
    pub connect_timeout_secs: u64,

    /// Extra `-o` options passed to ssh
    pub ssh_options: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            inventory_path: default_inventory_path(),
            pve_user: "root".to_string(),
            master_user: "admin".to_string(),
            ssh_port: 22,
            connect_timeout_secs: 3,
            ssh_options: vec!["StrictHostKeyChecking=accept-new".to_string()],
        }
    }
}

impl ResolverConfig {
    /// Load from `path`, or return the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path).map_err(|e| {
            PxcError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| PxcError::Config(e.to_string()))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_inventory_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_INVENTORY_FILE)
}
