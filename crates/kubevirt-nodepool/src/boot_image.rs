//! Boot image cache
//!
//! A boot image is either imported straight from its origin by every virtual
//! machine (`BootImage::Direct`) or imported once per owning cluster into a
//! shared DataVolume that machines clone from (`BootImage::Cached`).
//!
//! Cached volumes are content-addressed: the hash annotation identifies the
//! image, the infra-id label identifies the owner. Each cache call restores the
//! invariant that an owner has at most one live volume, and that volume holds
//! the desired image. The store gives no transactions, so two concurrent calls
//! may both create; the next call keeps the oldest and deletes the rest.

use crate::error::{BootImageError, CleanupError, CleanupFailure, ValidationError};
use crate::storage::storage_spec;
use crds::{
    DataVolumeSource, DataVolumeSourceHttp, DataVolumeSourcePvc, DataVolumeSourceRegistry,
    INFRA_ID_LABEL, KubevirtCachingStrategyType, KubevirtDiskImage, KubevirtNodePoolPlatform,
    RegistryPullMethod,
};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use volume_store::{BootVolume, NewBootVolume, VolumeQuery, VolumeStoreTrait};

/// Name prefix of cached boot image volumes
pub const BOOT_IMAGE_NAME_PREFIX: &str = "kv-boot-image-cache-";

/// Label marking a volume as a boot image cache
pub const BOOT_IMAGE_ROLE_LABEL: &str = "hypershift.openshift.io/kubevirt-boot-image-role";

/// Value of [`BOOT_IMAGE_ROLE_LABEL`]
pub const BOOT_IMAGE_ROLE_VALUE: &str = "kv-boot-image-cache";

/// Annotation carrying the content hash of the cached image
pub const BOOT_IMAGE_HASH_ANNOTATION: &str = "hypershift.openshift.io/kubevirt-boot-image-hash";

/// Ask CDI to bind the PVC immediately instead of waiting for a consumer
pub const CDI_BIND_IMMEDIATE_ANNOTATION: &str = "cdi.kubevirt.io/storage.bind.immediate.requested";

/// Ask CDI to keep the DataVolume after the import completes
pub const CDI_DELETE_AFTER_COMPLETION_ANNOTATION: &str =
    "cdi.kubevirt.io/storage.deleteAfterCompletion";

/// Kind of origin a boot image is imported from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSourceKind {
    /// Container disk in an OCI registry
    Registry,
    /// qcow2/raw disk served over HTTP(S)
    Http,
}

/// Origin of a boot image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLocator {
    pub url: String,
    pub kind: ImageSourceKind,
}

impl ImageLocator {
    pub fn registry(image: impl Into<String>) -> Self {
        Self {
            url: image.into(),
            kind: ImageSourceKind::Registry,
        }
    }

    pub fn http(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: ImageSourceKind::Http,
        }
    }

    /// Locator of a disk image; the container disk wins when both are set
    pub fn from_disk_image(image: &KubevirtDiskImage) -> Option<Self> {
        let non_empty = |s: &Option<String>| s.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
        non_empty(&image.container_disk_image)
            .map(Self::registry)
            .or_else(|| non_empty(&image.http_url).map(Self::http))
    }

    /// CDI source importing from the origin
    pub fn data_volume_source(&self) -> DataVolumeSource {
        match self.kind {
            ImageSourceKind::Registry => DataVolumeSource {
                registry: Some(DataVolumeSourceRegistry {
                    url: Some(format!("docker://{}", self.url)),
                    pull_method: Some(RegistryPullMethod::Node),
                }),
                ..Default::default()
            },
            ImageSourceKind::Http => DataVolumeSource {
                http: Some(DataVolumeSourceHttp {
                    url: self.url.clone(),
                }),
                ..Default::default()
            },
        }
    }
}

/// Content hash of a disk image: the declared hash, else SHA-256 of the locator
pub fn content_hash(image: &KubevirtDiskImage, locator: &ImageLocator) -> String {
    match image.hash.as_deref() {
        Some(hash) if !hash.is_empty() => hash.to_string(),
        _ => hex::encode(Sha256::digest(locator.url.as_bytes())),
    }
}

/// Result of a successful cache call
#[derive(Debug)]
pub struct CacheOutcome {
    /// Volume the machines should clone from
    pub volume_name: String,
    /// Whether the volume was created by this call
    pub created: bool,
    /// Stale volumes deleted by this call
    pub deleted: Vec<String>,
    /// Stale volumes that could not be deleted
    pub cleanup: Option<CleanupError>,
}

/// A boot image imported once per owner into a shared volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBootImage {
    pub locator: ImageLocator,
    pub hash: String,
    pub namespace: String,
    volume_name: Option<String>,
}

impl CachedBootImage {
    pub fn new(locator: ImageLocator, hash: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            locator,
            hash: hash.into(),
            namespace: namespace.into(),
            volume_name: None,
        }
    }

    /// Use an already known volume instead of calling [`Self::cache_image`]
    pub fn with_volume_name(mut self, name: impl Into<String>) -> Self {
        self.volume_name = Some(name.into());
        self
    }

    /// Volume resolved by the last successful cache call
    pub fn volume_name(&self) -> Option<&str> {
        self.volume_name.as_deref()
    }

    /// Resolve (reuse or create) the cached volume for `owner_id` and delete
    /// that owner's stale volumes
    ///
    /// Volumes owned by other clusters are never touched. Delete failures do
    /// not fail the call; they are reported in [`CacheOutcome::cleanup`].
    pub async fn cache_image<S>(
        &mut self,
        store: &S,
        platform: &KubevirtNodePoolPlatform,
        owner_id: &str,
    ) -> Result<CacheOutcome, BootImageError>
    where
        S: VolumeStoreTrait + ?Sized,
    {
        let query = VolumeQuery::in_namespace(&self.namespace)
            .with_label(BOOT_IMAGE_ROLE_LABEL, BOOT_IMAGE_ROLE_VALUE);
        let volumes = store
            .list_volumes(&query)
            .await
            .map_err(|source| BootImageError::List {
                namespace: self.namespace.clone(),
                source,
            })?;

        let mut owned: Vec<BootVolume> = volumes
            .into_iter()
            .filter(|v| v.label(INFRA_ID_LABEL) == Some(owner_id))
            .filter(|v| {
                if v.deleting {
                    debug!("Ignoring boot image volume {}/{} being deleted", v.namespace, v.name);
                }
                !v.deleting
            })
            .collect();
        owned.sort_by(oldest_first);

        let (volume_name, created) =
            match owned.iter().position(|v| v.annotation(BOOT_IMAGE_HASH_ANNOTATION) == Some(self.hash.as_str())) {
                Some(index) => {
                    let reused = owned.remove(index);
                    info!(
                        "Reusing boot image volume {}/{} for owner {}",
                        self.namespace, reused.name, owner_id
                    );
                    (reused.name, false)
                }
                None => {
                    let request = self.new_volume(platform, owner_id);
                    let volume = store.create_volume(request).await.map_err(|source| {
                        BootImageError::Create {
                            namespace: self.namespace.clone(),
                            source,
                        }
                    })?;
                    info!(
                        "Created boot image volume {}/{} for owner {} (hash {})",
                        self.namespace, volume.name, owner_id, self.hash
                    );
                    (volume.name, true)
                }
            };

        self.volume_name = Some(volume_name.clone());

        let mut deleted = Vec::new();
        let mut failures = Vec::new();
        for stale in owned {
            match store.delete_volume(&stale.namespace, &stale.name).await {
                Ok(()) => {
                    info!(
                        "Deleted stale boot image volume {}/{} for owner {}",
                        stale.namespace, stale.name, owner_id
                    );
                    deleted.push(stale.name);
                }
                Err(source) => {
                    warn!(
                        "Failed to delete stale boot image volume {}/{}: {}",
                        stale.namespace, stale.name, source
                    );
                    failures.push(CleanupFailure {
                        namespace: stale.namespace,
                        name: stale.name,
                        source,
                    });
                }
            }
        }

        Ok(CacheOutcome {
            volume_name,
            created,
            deleted,
            cleanup: (!failures.is_empty()).then_some(CleanupError { failures }),
        })
    }

    /// CDI source cloning from the cached volume
    ///
    /// Before the first cache call there is no volume to clone, so the image
    /// is imported from its origin instead.
    pub fn data_volume_source(&self) -> DataVolumeSource {
        match &self.volume_name {
            Some(name) => DataVolumeSource {
                pvc: Some(DataVolumeSourcePvc {
                    namespace: self.namespace.clone(),
                    name: name.clone(),
                }),
                ..Default::default()
            },
            None => self.locator.data_volume_source(),
        }
    }

    fn new_volume(&self, platform: &KubevirtNodePoolPlatform, owner_id: &str) -> NewBootVolume {
        let persistent = platform
            .root_volume
            .as_ref()
            .and_then(|root| root.volume.persistent.as_ref());

        NewBootVolume {
            namespace: self.namespace.clone(),
            generate_name: BOOT_IMAGE_NAME_PREFIX.to_string(),
            labels: BTreeMap::from([
                (BOOT_IMAGE_ROLE_LABEL.to_string(), BOOT_IMAGE_ROLE_VALUE.to_string()),
                (INFRA_ID_LABEL.to_string(), owner_id.to_string()),
            ]),
            annotations: BTreeMap::from([
                (BOOT_IMAGE_HASH_ANNOTATION.to_string(), self.hash.clone()),
                (CDI_BIND_IMMEDIATE_ANNOTATION.to_string(), "true".to_string()),
                (CDI_DELETE_AFTER_COMPLETION_ANNOTATION.to_string(), "false".to_string()),
            ]),
            source: self.locator.data_volume_source(),
            storage: storage_spec(persistent).unwrap_or_default(),
        }
    }
}

/// Earliest creation first, volumes without a timestamp last, then by name
fn oldest_first(a: &BootVolume, b: &BootVolume) -> Ordering {
    let by_age = match (&a.creation_timestamp, &b.creation_timestamp) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_age.then_with(|| a.name.cmp(&b.name))
}

/// Boot image of a node pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootImage {
    Cached(CachedBootImage),
    Direct(ImageLocator),
}

impl BootImage {
    /// Boot image for a platform, cached in `namespace` unless the cache
    /// strategy is `None`
    pub fn from_platform(
        platform: &KubevirtNodePoolPlatform,
        namespace: &str,
    ) -> Result<Self, ValidationError> {
        let root_volume = platform
            .root_volume
            .as_ref()
            .ok_or(ValidationError::MissingField {
                field: "spec.platform.kubevirt.rootVolume",
            })?;
        let image = root_volume
            .image
            .as_ref()
            .ok_or(ValidationError::MissingField {
                field: "spec.platform.kubevirt.rootVolume.image",
            })?;
        let locator = ImageLocator::from_disk_image(image).ok_or(ValidationError::MissingField {
            field: "spec.platform.kubevirt.rootVolume.image",
        })?;

        let strategy = root_volume
            .cache_strategy
            .as_ref()
            .map(|c| c.strategy_type)
            .unwrap_or_default();

        Ok(match strategy {
            KubevirtCachingStrategyType::Pvc => {
                let hash = content_hash(image, &locator);
                BootImage::Cached(CachedBootImage::new(locator, hash, namespace))
            }
            KubevirtCachingStrategyType::None => BootImage::Direct(locator),
        })
    }

    /// The cache handle, when this image is cached
    pub fn as_cached_mut(&mut self) -> Option<&mut CachedBootImage> {
        match self {
            BootImage::Cached(cached) => Some(cached),
            BootImage::Direct(_) => None,
        }
    }

    /// CDI source of the per-machine root volume
    pub fn data_volume_source(&self) -> DataVolumeSource {
        match self {
            BootImage::Cached(cached) => cached.data_volume_source(),
            BootImage::Direct(locator) => locator.data_volume_source(),
        }
    }
}

#[cfg(test)]
#[path = "boot_image_test.rs"]
mod boot_image_test;
