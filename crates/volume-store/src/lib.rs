//! Boot volume store
//!
//! Storage abstraction over CDI DataVolumes used by the boot image cache.
//! The cache logic only needs three operations: list by label, create with a
//! generated name, and delete by name.
//!
//! # Example
//!
//! ```no_run
//! use volume_store::{KubeVolumeStore, VolumeQuery, VolumeStoreTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubeVolumeStore::new(client);
//!
//! let query = VolumeQuery::in_namespace("clusters-guest")
//!     .with_label("hypershift.openshift.io/kubevirt-boot-image-role", "kv-boot-image-cache");
//! for volume in store.list_volumes(&query).await? {
//!     println!("{}", volume.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod query;
#[path = "trait.rs"]
pub mod volume_store_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeVolumeStore;
pub use error::VolumeStoreError;
pub use models::{BootVolume, NewBootVolume};
pub use query::VolumeQuery;
pub use volume_store_trait::VolumeStoreTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockVolumeStore, StoreCall};
