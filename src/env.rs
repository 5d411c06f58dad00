//! Cloud environment resolution over SSH
//!
//! The cloud keeps its shared state in the Proxmox cluster filesystem, which
//! is replicated to every host, so any online host can answer.

use crate::service::EnvResolver;
use crate::ssh::RemoteShell;
use crate::types::{CloudEnv, ClusterVars, PveHost};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub const CLUSTER_VARS_PATH: &str = "/etc/pve/cloud/cluster_vars.yaml";
pub const PATRONI_PASS_PATH: &str = "/etc/pve/cloud/secrets/patroni.pass";
pub const BIND_INTERNAL_KEY_PATH: &str = "/etc/pve/cloud/secrets/internal.key";

pub struct SshEnvResolver {
    shell: Arc<dyn RemoteShell>,
    user: String,
}

impl SshEnvResolver {
    pub fn new(shell: Arc<dyn RemoteShell>, user: impl Into<String>) -> Self {
        Self {
            shell,
            user: user.into(),
        }
    }

    async fn read(&self, host: &PveHost, path: &str) -> Result<String> {
        self.shell
            .exec(&self.user, &host.address, &format!("cat {}", path))
            .await
    }
}

#[async_trait]
impl EnvResolver for SshEnvResolver {
    async fn cloud_env(&self, host: &PveHost) -> Result<CloudEnv> {
        debug!("Reading cloud env from {}", host.address);

        let cluster_vars = ClusterVars::parse(self.read(host, CLUSTER_VARS_PATH).await?)?;
        let patroni_pass = self.read(host, PATRONI_PASS_PATH).await?;
        let bind_internal_key = self.read(host, BIND_INTERNAL_KEY_PATH).await?;

        Ok(CloudEnv {
            host: host.clone(),
            cluster_vars,
            patroni_pass: patroni_pass.trim_end().to_string(),
            bind_internal_key: bind_internal_key.trim_end().to_string(),
        })
    }
}
