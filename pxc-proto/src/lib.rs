//! gRPC protocol definitions for pxc
//!
//! Defines:
//! - `CloudService` - kubeconfig, cluster vars, host and inventory lookups
//! - `Health` - liveness and version compatibility check
//!
//! Generated from `proto/cloud.proto`.

pub mod v1 {
    tonic::include_proto!("pxc.v1");
}

pub use v1::cloud_service_client::CloudServiceClient;
pub use v1::cloud_service_server::{CloudService, CloudServiceServer};
pub use v1::health_check_response::ServingStatus;
pub use v1::health_client::HealthClient;
pub use v1::health_server::{Health, HealthServer};
pub use v1::*;
