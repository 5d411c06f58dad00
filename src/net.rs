//! Network probes used during resolution
//!
//! Kept behind traits so discovery can be tested without a network.

use crate::{PxcError, Result};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Checks whether a host accepts TCP connections
#[async_trait]
pub trait Reachability: Send + Sync {
    async fn is_reachable(&self, address: &str, port: u16) -> bool;
}

/// Resolves DNS names to addresses
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>>;
}

/// Probes and lookups backed by the operating system
#[derive(Debug, Clone)]
pub struct SystemNet {
    connect_timeout: Duration,
}

impl SystemNet {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Reachability for SystemNet {
    async fn is_reachable(&self, address: &str, port: u16) -> bool {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect((address, port))).await
        {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("{}:{} refused: {}", address, port, e);
                false
            }
            Err(_) => {
                debug!("{}:{} timed out after {:?}", address, port, self.connect_timeout);
                false
            }
        }
    }
}

#[async_trait]
impl NameResolver for SystemNet {
    async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((name, 0)).await.map_err(|e| {
            PxcError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to resolve {}: {}", name, e),
            ))
        })?;

        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }
        Ok(ips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_listening_port_is_reachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let net = SystemNet::new(Duration::from_secs(1));
        assert!(net.is_reachable("127.0.0.1", port).await);
    }

    #[tokio::test]
    async fn test_closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let net = SystemNet::new(Duration::from_secs(1));
        assert!(!net.is_reachable("127.0.0.1", port).await);
    }

    #[tokio::test]
    async fn test_resolve_ip_literal() {
        let net = SystemNet::new(Duration::from_secs(1));
        let ips = net.resolve("127.0.0.1").await.expect("literal resolves");
        assert_eq!(ips, vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);
    }
}
