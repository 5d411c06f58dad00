//! Admin kubeconfig retrieval from a stack's control-plane masters

use crate::net::NameResolver;
use crate::service::KubeconfigSource;
use crate::ssh::RemoteShell;
use crate::types::CloudEnv;
use crate::{PxcError, Result};
use async_trait::async_trait;
use kube::config::Kubeconfig;
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const ADMIN_CONF_PATH: &str = "/etc/kubernetes/admin.conf";
pub const API_SERVER_PORT: u16 = 6443;

/// DNS record listing the masters of a stack
pub fn masters_record(stack_name: &str, cloud_domain: &str) -> String {
    format!("masters-{}.{}", stack_name, cloud_domain)
}

/// External API server endpoint of a stack
pub fn external_server(stack_name: &str, cloud_domain: &str) -> String {
    format!("https://{}.{}:{}", stack_name, cloud_domain, API_SERVER_PORT)
}

/// Validate `raw` as a kubeconfig and point loopback servers at `server`
///
/// kubeadm writes the local API endpoint into admin.conf on some setups;
/// such a config only works on the master itself.
pub fn rewrite_loopback_servers(raw: &str, server: &str) -> Result<String> {
    let parsed = Kubeconfig::from_yaml(raw).map_err(|e| PxcError::Kubeconfig(e.to_string()))?;
    if parsed.clusters.is_empty() {
        return Err(PxcError::Kubeconfig("no clusters defined".to_string()));
    }

    let mut doc: serde_yaml::Value = serde_yaml::from_str(raw)?;
    let mut rewritten = 0;

    if let Some(clusters) = doc.get_mut("clusters").and_then(|c| c.as_sequence_mut()) {
        for entry in clusters {
            let Some(current) = entry
                .get_mut("cluster")
                .and_then(|c| c.get_mut("server"))
            else {
                continue;
            };
            if current.as_str().map(is_loopback_url).unwrap_or(false) {
                *current = serde_yaml::Value::String(server.to_string());
                rewritten += 1;
            }
        }
    }

    if rewritten == 0 {
        return Ok(raw.to_string());
    }
    debug!("Rewrote {} loopback server(s) to {}", rewritten, server);
    Ok(serde_yaml::to_string(&doc)?)
}

fn is_loopback_url(url: &str) -> bool {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let authority = rest.split('/').next().unwrap_or_default();

    let host = if let Some(bracketed) = authority.strip_prefix('[') {
        bracketed.split(']').next().unwrap_or_default()
    } else {
        authority.rsplit_once(':').map(|(h, _)| h).unwrap_or(authority)
    };

    host == "localhost"
        || host
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
}

/// Write a kubeconfig readable only by the owner
pub fn write_kubeconfig(path: &Path, contents: &str) -> Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())?;
    Ok(())
}

/// `KubeconfigSource` that reads admin.conf from the first reachable master
pub struct SshKubeconfigSource {
    shell: Arc<dyn RemoteShell>,
    resolver: Arc<dyn NameResolver>,
    user: String,
}

impl SshKubeconfigSource {
    pub fn new(
        shell: Arc<dyn RemoteShell>,
        resolver: Arc<dyn NameResolver>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            shell,
            resolver,
            user: user.into(),
        }
    }
}

#[async_trait]
impl KubeconfigSource for SshKubeconfigSource {
    async fn master_kubeconfig(&self, env: &CloudEnv, stack_name: &str) -> Result<String> {
        let stack_name = stack_name.trim();
        if stack_name.is_empty() || stack_name.contains(char::is_whitespace) {
            return Err(PxcError::InvalidStack(stack_name.to_string()));
        }

        let domain = env.cluster_vars.cloud_domain();
        let record = masters_record(stack_name, domain);
        let masters = match self.resolver.resolve(&record).await {
            Ok(masters) => masters,
            Err(e) => {
                warn!("Failed to resolve masters of {}: {}", stack_name, e);
                return Err(PxcError::NoMasters {
                    stack: stack_name.to_string(),
                    record,
                });
            }
        };

        for master in &masters {
            let address = master.to_string();
            match self
                .shell
                .exec(&self.user, &address, &format!("sudo cat {}", ADMIN_CONF_PATH))
                .await
            {
                Ok(raw) => {
                    info!("Fetched kubeconfig for {} from master {}", stack_name, address);
                    return rewrite_loopback_servers(&raw, &external_server(stack_name, domain));
                }
                Err(e) => warn!("Master {} of {} unavailable: {}", address, stack_name, e),
            }
        }

        Err(PxcError::NoMasters {
            stack: stack_name.to_string(),
            record,
        })
    }
}
