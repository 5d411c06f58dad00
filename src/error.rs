use thiserror::Error;

#[derive(Error, Debug)]
pub enum PxcError {
    #[error("Invalid target '{0}': expected <cluster>.<cloud-domain>")]
    InvalidTarget(String),

    #[error("Target {cluster} not found in inventory for cloud domain {cloud_domain}")]
    UnknownTarget {
        cluster: String,
        cloud_domain: String,
    },

    #[error("No online host found for target {0}")]
    NoOnlineHost(String),

    #[error("Invalid stack name: {0}")]
    InvalidStack(String),

    #[error("Inventory error: {0}")]
    Inventory(String),

    #[error("SSH to {host} failed: {message}")]
    Ssh { host: String, message: String },

    #[error("Invalid cluster vars: {0}")]
    ClusterVars(String),

    #[error("Invalid kubeconfig: {0}")]
    Kubeconfig(String),

    #[error("No reachable master for stack {stack} ({record})")]
    NoMasters { stack: String, record: String },

    #[error("Kubernetes error: {0}")]
    Kubernetes(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl PxcError {
    /// True when the error was caused by the caller's input rather than the cloud
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidTarget(_) | Self::InvalidStack(_))
    }
}

pub type Result<T> = std::result::Result<T, PxcError>;
