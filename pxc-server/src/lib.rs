//! gRPC endpoint for pxc
//!
//! Responsibilities:
//! - Serve `CloudService` (kubeconfig, cluster vars, host lookup)
//! - Serve `Health` for launchers waiting on startup
//! - Listen on TCP (:50051) or on a per-parent unix socket

pub mod grpc_server;
pub mod parent;
