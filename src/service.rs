//! Resolution pipeline shared by the RPC endpoint and the local CLI
//!
//! Three collaborators run in a fixed order:
//! - `HostDiscovery` - target identifier -> reachable Proxmox host, and the
//!   inventory of the target's cloud
//! - `EnvResolver` - host -> cluster vars and credentials
//! - `KubeconfigSource` - environment + stack name -> kubeconfig
//!
//! `CloudResolver` owns one of each and adds no retry, timeout or
//! transformation of its own.

use crate::config::ResolverConfig;
use crate::env::SshEnvResolver;
use crate::inventory::InventoryHostDiscovery;
use crate::kubeconfig::SshKubeconfigSource;
use crate::net::SystemNet;
use crate::ssh::OpenSsh;
use crate::types::{CloudEnv, CloudInventory, PveHost};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

#[async_trait]
pub trait HostDiscovery: Send + Sync {
    async fn online_host(&self, target_pve: &str) -> Result<PveHost>;

    async fn cloud_inventory(&self, target_pve: &str) -> Result<CloudInventory>;
}

#[async_trait]
pub trait EnvResolver: Send + Sync {
    async fn cloud_env(&self, host: &PveHost) -> Result<CloudEnv>;
}

#[async_trait]
pub trait KubeconfigSource: Send + Sync {
    async fn master_kubeconfig(&self, env: &CloudEnv, stack_name: &str) -> Result<String>;
}

/// Outcome of a health check against a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Serving,
    Mismatch(String),
}

#[derive(Clone)]
pub struct CloudResolver {
    discovery: Arc<dyn HostDiscovery>,
    env: Arc<dyn EnvResolver>,
    kubeconfig: Arc<dyn KubeconfigSource>,
}

impl CloudResolver {
    pub fn new(
        discovery: Arc<dyn HostDiscovery>,
        env: Arc<dyn EnvResolver>,
        kubeconfig: Arc<dyn KubeconfigSource>,
    ) -> Self {
        Self {
            discovery,
            env,
            kubeconfig,
        }
    }

    /// Resolver backed by the inventory file, system DNS and `ssh`
    pub fn from_config(config: &ResolverConfig) -> Self {
        let net = Arc::new(SystemNet::new(config.connect_timeout()));
        let shell = Arc::new(OpenSsh::new(
            config.ssh_port,
            config.connect_timeout(),
            config.ssh_options.clone(),
        ));

        Self::new(
            Arc::new(InventoryHostDiscovery::new(
                config.inventory_path.clone(),
                net.clone(),
                config.ssh_port,
            )),
            Arc::new(SshEnvResolver::new(shell.clone(), config.pve_user.clone())),
            Arc::new(SshKubeconfigSource::new(
                shell,
                net,
                config.master_user.clone(),
            )),
        )
    }

    pub async fn proxmox_host(&self, target_pve: &str) -> Result<PveHost> {
        let host = self.discovery.online_host(target_pve).await?;
        debug!("{} -> {} ({})", target_pve, host.name, host.address);
        Ok(host)
    }

    /// Inventory of the cloud domain `target_pve` belongs to
    pub async fn pve_inventory(&self, target_pve: &str) -> Result<CloudInventory> {
        self.discovery.cloud_inventory(target_pve).await
    }

    pub async fn cloud_env(&self, target_pve: &str) -> Result<CloudEnv> {
        let host = self.proxmox_host(target_pve).await?;
        self.env.cloud_env(&host).await
    }

    /// Raw cluster vars document of the target
    pub async fn cluster_vars(&self, target_pve: &str) -> Result<String> {
        let env = self.cloud_env(target_pve).await?;
        Ok(env.cluster_vars.raw().to_string())
    }

    /// Admin kubeconfig of `stack_name`, exactly as the source returns it
    pub async fn master_kubeconfig(&self, target_pve: &str, stack_name: &str) -> Result<String> {
        info!("Fetching kubeconfig for stack {} on {}", stack_name, target_pve);
        let env = self.cloud_env(target_pve).await?;
        self.kubeconfig.master_kubeconfig(&env, stack_name).await
    }

    /// An empty target only confirms the resolver is up. Otherwise the
    /// cloud's recorded tooling version must share major.minor with ours.
    pub async fn health(&self, target_pve: &str) -> Result<HealthStatus> {
        if target_pve.is_empty() {
            return Ok(HealthStatus::Serving);
        }

        let env = self.cloud_env(target_pve).await?;
        Ok(match env.cluster_vars.cloud_version() {
            Some(remote) if !same_minor(&remote, crate::VERSION) => HealthStatus::Mismatch(
                format!(
                    "{} runs pve cloud {}, this endpoint is {}",
                    target_pve,
                    remote,
                    crate::VERSION
                ),
            ),
            _ => HealthStatus::Serving,
        })
    }
}

fn major_minor(version: &str) -> Option<(&str, &str)> {
    let version = version.trim().trim_start_matches('v');
    let mut parts = version.split('.');
    Some((parts.next()?, parts.next()?))
}

fn same_minor(a: &str, b: &str) -> bool {
    match (major_minor(a), major_minor(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClusterVars;
    use crate::PxcError;
    use std::sync::Mutex;

    type CallLog = Arc<Mutex<Vec<String>>>;

    struct MockDiscovery {
        calls: CallLog,
        fail: bool,
    }

    #[async_trait]
    impl HostDiscovery for MockDiscovery {
        async fn online_host(&self, target_pve: &str) -> Result<PveHost> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("discovery:{}", target_pve));
            if self.fail {
                return Err(PxcError::NoOnlineHost(target_pve.to_string()));
            }
            Ok(host())
        }

        async fn cloud_inventory(&self, target_pve: &str) -> Result<CloudInventory> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("inventory:{}", target_pve));
            Ok(CloudInventory {
                inventory: "pve: {}\n".to_string(),
                cloud_domain: "example.com".to_string(),
            })
        }
    }

    struct MockEnv {
        calls: CallLog,
        vars: &'static str,
    }

    #[async_trait]
    impl EnvResolver for MockEnv {
        async fn cloud_env(&self, host: &PveHost) -> Result<CloudEnv> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("env:{}", host.address));
            Ok(CloudEnv {
                host: host.clone(),
                cluster_vars: ClusterVars::parse(self.vars)?,
                patroni_pass: "pass".to_string(),
                bind_internal_key: "key".to_string(),
            })
        }
    }

    struct MockKubeconfig {
        calls: CallLog,
        config: &'static str,
    }

    #[async_trait]
    impl KubeconfigSource for MockKubeconfig {
        async fn master_kubeconfig(&self, env: &CloudEnv, stack_name: &str) -> Result<String> {
            self.calls.lock().unwrap().push(format!(
                "kubeconfig:{}:{}",
                env.cluster_vars.cloud_domain(),
                stack_name
            ));
            Ok(self.config.to_string())
        }
    }

    fn host() -> PveHost {
        PveHost {
            name: "pve1".to_string(),
            address: "10.0.0.11".to_string(),
            cluster: "pve-a".to_string(),
            cloud_domain: "example.com".to_string(),
        }
    }

    fn resolver(calls: &CallLog, fail_discovery: bool, vars: &'static str) -> CloudResolver {
        CloudResolver::new(
            Arc::new(MockDiscovery {
                calls: calls.clone(),
                fail: fail_discovery,
            }),
            Arc::new(MockEnv {
                calls: calls.clone(),
                vars,
            }),
            Arc::new(MockKubeconfig {
                calls: calls.clone(),
                config: "apiVersion: v1\nkind: Config\n# untouched\n",
            }),
        )
    }

    #[tokio::test]
    async fn test_kubeconfig_calls_collaborators_in_order() {
        let calls = CallLog::default();
        let resolver = resolver(&calls, false, "pve_cloud_domain: example.com");

        let config = resolver
            .master_kubeconfig("pve-a.example.com", "k8s-prod")
            .await
            .expect("pipeline succeeds");

        assert_eq!(config, "apiVersion: v1\nkind: Config\n# untouched\n");
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "discovery:pve-a.example.com",
                "env:10.0.0.11",
                "kubeconfig:example.com:k8s-prod",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_discovery_stops_pipeline() {
        let calls = CallLog::default();
        let resolver = resolver(&calls, true, "pve_cloud_domain: example.com");

        let err = resolver
            .master_kubeconfig("pve-a.example.com", "k8s-prod")
            .await
            .unwrap_err();

        assert!(matches!(err, PxcError::NoOnlineHost(_)));
        assert_eq!(*calls.lock().unwrap(), vec!["discovery:pve-a.example.com"]);
    }

    #[tokio::test]
    async fn test_cluster_vars_skips_kubeconfig() {
        let calls = CallLog::default();
        let resolver = resolver(&calls, false, "pve_cloud_domain: example.com\nx: 1\n");

        let vars = resolver.cluster_vars("pve-a.example.com").await.unwrap();

        assert_eq!(vars, "pve_cloud_domain: example.com\nx: 1\n");
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_pve_inventory_only_uses_discovery() {
        let calls = CallLog::default();
        let resolver = resolver(&calls, false, "pve_cloud_domain: example.com");

        let cloud = resolver.pve_inventory("pve-a.example.com").await.unwrap();

        assert_eq!(cloud.cloud_domain, "example.com");
        assert_eq!(*calls.lock().unwrap(), vec!["inventory:pve-a.example.com"]);
    }

    #[tokio::test]
    async fn test_health_empty_target_is_serving() {
        let calls = CallLog::default();
        let resolver = resolver(&calls, true, "pve_cloud_domain: example.com");

        assert_eq!(resolver.health("").await.unwrap(), HealthStatus::Serving);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_version_mismatch() {
        let calls = CallLog::default();
        let resolver = resolver(
            &calls,
            false,
            "pve_cloud_domain: example.com\npve_cloud_version: 99.0.0\n",
        );

        match resolver.health("pve-a.example.com").await.unwrap() {
            HealthStatus::Mismatch(msg) => assert!(msg.contains("99.0.0")),
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_health_without_version_is_serving() {
        let calls = CallLog::default();
        let resolver = resolver(&calls, false, "pve_cloud_domain: example.com");

        assert_eq!(
            resolver.health("pve-a.example.com").await.unwrap(),
            HealthStatus::Serving
        );
    }

    #[tokio::test]
    async fn test_health_ignores_unquoted_version() {
        let calls = CallLog::default();
        let resolver = resolver(
            &calls,
            false,
            "pve_cloud_domain: example.com\npve_cloud_version: 0.10\n",
        );

        assert_eq!(
            resolver.health("pve-a.example.com").await.unwrap(),
            HealthStatus::Serving
        );
    }

    #[test]
    fn test_same_minor() {
        assert!(same_minor("0.3.0", "0.3.7"));
        assert!(same_minor("v1.2.3", "1.2.0"));
        assert!(!same_minor("0.4.0", "0.3.1"));
        assert!(same_minor("dev", "dev"));
    }
}
