//! gRPC server implementation for the endpoint
//!
//! Implements `CloudService` and `Health` on top of a `CloudResolver`.
//! Handlers only translate between wire types and the resolver.

use anyhow::{Context, Result};
use log::{info, warn};
use pxc::{CloudResolver, HealthStatus, PxcError};
use pxc_proto::{
    CloudService, CloudServiceServer, GetClusterVarsRequest, GetClusterVarsResponse,
    GetKubeconfigRequest, GetKubeconfigResponse, GetProxmoxHostRequest, GetProxmoxHostResponse,
    GetPveInventoryRequest, GetPveInventoryResponse, Health, HealthCheckRequest, HealthCheckResponse, HealthServer, ServingStatus,
};
use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::{TcpListener, UnixListener};
use tokio_stream::wrappers::{TcpListenerStream, UnixListenerStream};
use tonic::transport::Server;
use tonic::{Request, Response, Status};

/// Default TCP binding: all interfaces, plaintext
pub const DEFAULT_LISTEN_ADDR: &str = "[::]:50051";

/// Map a resolver error onto a gRPC status
pub fn status_from(err: PxcError) -> Status {
    let message = err.to_string();
    if err.is_invalid_input() {
        return Status::invalid_argument(message);
    }
    match err {
        PxcError::UnknownTarget { .. } => Status::not_found(message),
        PxcError::NoOnlineHost(_) | PxcError::NoMasters { .. } => Status::unavailable(message),
        _ => Status::internal(message),
    }
}

/// `CloudService` implementation
pub struct CloudRpc {
    resolver: CloudResolver,
}

impl CloudRpc {
    pub fn new(resolver: CloudResolver) -> Self {
        Self { resolver }
    }
}

#[tonic::async_trait]
impl CloudService for CloudRpc {
    async fn get_master_kubeconfig(
        &self,
        request: Request<GetKubeconfigRequest>,
    ) -> Result<Response<GetKubeconfigResponse>, Status> {
        let req = request.into_inner();
        info!(
            "GetMasterKubeconfig target_pve={} stack_name={}",
            req.target_pve, req.stack_name
        );

        let config = self
            .resolver
            .master_kubeconfig(&req.target_pve, &req.stack_name)
            .await
            .map_err(|e| {
                warn!("GetMasterKubeconfig for {} failed: {}", req.target_pve, e);
                status_from(e)
            })?;

        Ok(Response::new(GetKubeconfigResponse { config }))
    }

    async fn get_cluster_vars(
        &self,
        request: Request<GetClusterVarsRequest>,
    ) -> Result<Response<GetClusterVarsResponse>, Status> {
        let req = request.into_inner();
        info!("GetClusterVars target_pve={}", req.target_pve);

        let vars = self
            .resolver
            .cluster_vars(&req.target_pve)
            .await
            .map_err(status_from)?;

        Ok(Response::new(GetClusterVarsResponse { vars }))
    }

    async fn get_proxmox_host(
        &self,
        request: Request<GetProxmoxHostRequest>,
    ) -> Result<Response<GetProxmoxHostResponse>, Status> {
        let req = request.into_inner();
        info!("GetProxmoxHost target_pve={}", req.target_pve);

        let host = self
            .resolver
            .proxmox_host(&req.target_pve)
            .await
            .map_err(status_from)?;

        Ok(Response::new(GetProxmoxHostResponse {
            pve_host: host.address,
        }))
    }

    async fn get_pve_inventory(
        &self,
        request: Request<GetPveInventoryRequest>,
    ) -> Result<Response<GetPveInventoryResponse>, Status> {
        let req = request.into_inner();
        info!("GetPveInventory target_pve={}", req.target_pve);

        let cloud = self
            .resolver
            .pve_inventory(&req.target_pve)
            .await
            .map_err(status_from)?;

        Ok(Response::new(GetPveInventoryResponse {
            inventory: cloud.inventory,
            cloud_domain: cloud.cloud_domain,
        }))
    }
}

/// `Health` implementation
pub struct HealthRpc {
    resolver: CloudResolver,
}

impl HealthRpc {
    pub fn new(resolver: CloudResolver) -> Self {
        Self { resolver }
    }
}

#[tonic::async_trait]
impl Health for HealthRpc {
    async fn check(
        &self,
        request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        let req = request.into_inner();

        let (status, error_message) = match self
            .resolver
            .health(&req.target_pve)
            .await
            .map_err(status_from)?
        {
            HealthStatus::Serving => (ServingStatus::Serving, String::new()),
            HealthStatus::Mismatch(msg) => {
                warn!("Health check mismatch: {}", msg);
                (ServingStatus::Missmatch, msg)
            }
        };

        Ok(Response::new(HealthCheckResponse {
            status: status as i32,
            error_message,
        }))
    }
}

/// Where the server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listen {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl Listen {
    /// Socket path the Terraform provider expects for a given parent process
    pub fn for_parent(pid: u32) -> Self {
        Self::Unix(PathBuf::from(format!("/tmp/pc-rpc-{}.sock", pid)))
    }
}

fn router(resolver: CloudResolver) -> tonic::transport::server::Router {
    Server::builder()
        .add_service(CloudServiceServer::new(CloudRpc::new(resolver.clone())))
        .add_service(HealthServer::new(HealthRpc::new(resolver)))
}

/// Serve on an already bound TCP listener until `shutdown` completes
pub async fn serve_tcp(
    resolver: CloudResolver,
    listener: TcpListener,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    info!("gRPC server running on {}", listener.local_addr()?);

    router(resolver)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await
        .context("gRPC server error")
}

/// Serve on a unix socket until `shutdown` completes
///
/// A stale socket file is replaced; the file is removed again on exit.
pub async fn serve_unix(
    resolver: CloudResolver,
    path: &Path,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    remove_stale_socket(path)?;
    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind {}", path.display()))?;

    info!("gRPC server running on unix://{}", path.display());

    let result = router(resolver)
        .serve_with_incoming_shutdown(UnixListenerStream::new(listener), shutdown)
        .await
        .context("gRPC server error");

    if let Err(e) = std::fs::remove_file(path) {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
    result
}

/// Start the gRPC server and block until `shutdown` completes
pub async fn start_server(
    resolver: CloudResolver,
    listen: Listen,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    match listen {
        Listen::Tcp(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            serve_tcp(resolver, listener, shutdown).await
        }
        Listen::Unix(path) => serve_unix(resolver, &path, shutdown).await,
    }
}

fn remove_stale_socket(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            info!("Removed stale socket {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}
