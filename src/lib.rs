pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod inventory;
pub mod k8s;
pub mod kubeconfig;
pub mod net;
pub mod service;
pub mod ssh;
pub mod types;

pub use config::ResolverConfig;
pub use error::{PxcError, Result};
pub use service::{CloudResolver, EnvResolver, HealthStatus, HostDiscovery, KubeconfigSource};
pub use types::{CloudEnv, CloudInventory, ClusterVars, PveHost, TargetPve};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
