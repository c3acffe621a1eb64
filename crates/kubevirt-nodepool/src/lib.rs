//! KubeVirt node pool platform
//!
//! Turns the KubeVirt block of a HyperShift NodePool into the artifacts the
//! machine reconciler needs:
//!
//! - **Validation**: structural checks on the platform block before anything
//!   is created
//! - **Boot image cache**: one content-addressed DataVolume per hosted cluster
//!   and image, with stale images garbage collected
//! - **Machine template**: the CAPK `KubevirtMachineTemplate` spec
//! - **Cluster validation**: infra cluster version gates for hosted clusters
//!
//! # Example
//!
//! ```no_run
//! use kubevirt_nodepool::{BootImage, machine_template_spec, validate_platform};
//! use volume_store::KubeVolumeStore;
//!
//! # async fn example(node_pool: crds::NodePool) -> Result<(), Box<dyn std::error::Error>> {
//! validate_platform(&node_pool)?;
//! let platform = node_pool.spec.platform.kubevirt.as_ref().ok_or("no kubevirt block")?;
//!
//! let store = KubeVolumeStore::new(kube::Client::try_default().await?);
//! let mut boot_image = BootImage::from_platform(platform, "clusters-guest")?;
//! if let Some(cached) = boot_image.as_cached_mut() {
//!     cached.cache_image(&store, platform, "guest-infra-id").await?;
//! }
//!
//! let template = machine_template_spec(platform, &boot_image, "guest-infra-id", "workers");
//! # let _ = template;
//! # Ok(())
//! # }
//! ```

pub mod boot_image;
pub mod cluster_validation;
pub mod error;
pub mod machine_template;
mod storage;
pub mod validation;

pub use boot_image::{
    BootImage, CacheOutcome, CachedBootImage, ImageLocator, ImageSourceKind, content_hash,
};
pub use cluster_validation::{ClusterValidator, InfraVersionProvider, InfraVersions};
pub use error::{
    BootImageError, CleanupError, CleanupFailure, ClusterValidationError, ValidationError,
};
pub use machine_template::machine_template_spec;
pub use validation::{validate_kubevirt_platform, validate_platform};
