//! Volume store errors

use thiserror::Error;

/// Errors that can occur when listing, creating or deleting boot volumes
#[derive(Debug, Error)]
pub enum VolumeStoreError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Invalid request or response (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The store could not serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
