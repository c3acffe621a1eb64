//! Controller-specific error types.
//!
//! Wraps the library errors of the node pool pipeline plus the Kubernetes
//! and configuration failures of the controller itself.

use kube::Error as KubeError;
use kubevirt_nodepool::{BootImageError, ClusterValidationError, ValidationError};
use thiserror::Error;

/// Errors that can occur in the NodePool Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// NodePool platform block is incomplete
    #[error("Invalid NodePool platform: {0}")]
    Validation(#[from] ValidationError),

    /// Boot image could not be cached
    #[error("Boot image error: {0}")]
    BootImage(#[from] BootImageError),

    /// Hosted cluster cannot host KubeVirt node pools
    #[error("Cluster validation failed: {0}")]
    ClusterValidation(#[from] ClusterValidationError),

    /// Owning HostedCluster not found
    #[error("HostedCluster not found: {0}")]
    HostedClusterNotFound(String),

    /// Owning HostedCluster exists but is not provisioned far enough yet
    #[error("HostedCluster not ready: {0}")]
    HostedClusterNotReady(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Metrics registry or encoding failure
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Probe and metrics server failed
    #[error("Probe server error: {0}")]
    ProbeServer(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Whether retrying without a spec change can help
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ControllerError::Validation(_) | ControllerError::InvalidConfig(_)
        )
    }
}
