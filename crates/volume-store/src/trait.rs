//! VolumeStore trait for mocking
//!
//! Abstracts the backing store of boot volumes so cache logic can run against
//! the Kubernetes API in production and an in-memory store in unit tests.
//! The store offers no transactions: every call stands alone.

use crate::error::VolumeStoreError;
use crate::models::{BootVolume, NewBootVolume};
use crate::query::VolumeQuery;

/// Boot volume store operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait VolumeStoreTrait: Send + Sync {
    /// List volumes matching a namespace and label query
    async fn list_volumes(&self, query: &VolumeQuery) -> Result<Vec<BootVolume>, VolumeStoreError>;

    /// Create a volume; the returned volume carries the generated name
    async fn create_volume(&self, volume: NewBootVolume) -> Result<BootVolume, VolumeStoreError>;

    /// Delete a volume by name. Deleting a volume that is already gone succeeds.
    async fn delete_volume(&self, namespace: &str, name: &str) -> Result<(), VolumeStoreError>;
}
