//! Example KubeVirt node pool platforms
//!
//! Builds a `KubevirtNodePoolPlatform` from flat, CLI-style options. Used by
//! tooling that renders example manifests and by tests that need a realistic
//! platform block without spelling out every nested struct.

use crate::node_pool::{
    KubevirtCachingStrategy, KubevirtCachingStrategyType, KubevirtCompute, KubevirtDiskImage,
    KubevirtNodePoolPlatform, KubevirtPersistentVolume, KubevirtRootVolume, KubevirtVolume,
    KubevirtVolumeType, MultiQueueSetting, PersistentVolumeAccessMode, QoSClass,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use thiserror::Error;

/// Errors raised while turning example options into a platform
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FixtureError {
    #[error("invalid root volume access mode: {0}")]
    InvalidAccessMode(String),
}

/// Options for an example KubeVirt node pool platform
///
/// Every optional field left as `None` is simply omitted from the result.
#[derive(Debug, Clone, Default)]
pub struct ExampleKubevirtOptions {
    /// Guest memory, e.g. "8Gi"
    pub memory: Option<String>,
    /// Virtual CPU cores; zero leaves cores unset
    pub cores: u32,
    /// Container disk image
    pub image: Option<String>,
    /// HTTP(S) disk image URL
    pub image_url: Option<String>,
    /// Root volume size in GiB
    pub root_volume_size: u32,
    pub root_volume_storage_class: Option<String>,
    /// Comma separated access modes, e.g. "ReadWriteMany,ReadWriteOnce"
    pub root_volume_access_modes: Option<String>,
    /// "Filesystem" or "Block"
    pub root_volume_volume_mode: Option<String>,
    /// "PVC" or "None"; anything else leaves the strategy unset
    pub cache_strategy_type: Option<String>,
    pub network_interface_multi_queue: Option<MultiQueueSetting>,
    pub qos_class: Option<QoSClass>,
}

/// Build a KubeVirt node pool platform from example options
///
/// Multi-queue is only carried when set to `Enable` and the QoS class only when
/// `Guaranteed`; the other values are the platform defaults.
pub fn example_kubevirt_template(
    options: &ExampleKubevirtOptions,
) -> Result<KubevirtNodePoolPlatform, FixtureError> {
    let access_modes = match options.root_volume_access_modes.as_deref() {
        Some(modes) if !modes.is_empty() => modes
            .split(',')
            .map(|m| m.parse::<PersistentVolumeAccessMode>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(FixtureError::InvalidAccessMode)?,
        _ => Vec::new(),
    };

    let cache_strategy = match options.cache_strategy_type.as_deref() {
        Some("PVC") => Some(KubevirtCachingStrategy {
            strategy_type: KubevirtCachingStrategyType::Pvc,
        }),
        Some("None") => Some(KubevirtCachingStrategy {
            strategy_type: KubevirtCachingStrategyType::None,
        }),
        _ => None,
    };

    let image = if options.image.is_some() || options.image_url.is_some() {
        Some(KubevirtDiskImage {
            container_disk_image: options.image.clone(),
            http_url: options.image_url.clone(),
            hash: None,
        })
    } else {
        None
    };

    let compute = KubevirtCompute {
        memory: options.memory.clone().map(Quantity),
        cores: (options.cores != 0).then_some(options.cores),
        qos_class: options
            .qos_class
            .filter(|qos| *qos == QoSClass::Guaranteed),
    };

    Ok(KubevirtNodePoolPlatform {
        root_volume: Some(KubevirtRootVolume {
            image,
            volume: KubevirtVolume {
                volume_type: KubevirtVolumeType::Persistent,
                persistent: Some(KubevirtPersistentVolume {
                    size: Some(Quantity(format!("{}Gi", options.root_volume_size))),
                    storage_class: options.root_volume_storage_class.clone(),
                    access_modes,
                    volume_mode: options.root_volume_volume_mode.clone(),
                }),
            },
            cache_strategy,
        }),
        compute: Some(compute),
        network_interface_multi_queue: options
            .network_interface_multi_queue
            .filter(|mq| *mq == MultiQueueSetting::Enable),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_options() -> ExampleKubevirtOptions {
        ExampleKubevirtOptions {
            memory: Some("5Gi".to_string()),
            cores: 4,
            image: Some("testimage".to_string()),
            root_volume_size: 32,
            ..Default::default()
        }
    }

    #[test]
    fn test_example_template_basic_shape() {
        let platform = example_kubevirt_template(&base_options()).unwrap();

        let compute = platform.compute.unwrap();
        assert_eq!(compute.cores, Some(4));
        assert_eq!(compute.memory, Some(Quantity("5Gi".to_string())));
        assert_eq!(compute.qos_class, None);

        let root = platform.root_volume.unwrap();
        assert_eq!(
            root.image.unwrap().container_disk_image.as_deref(),
            Some("testimage")
        );
        let persistent = root.volume.persistent.unwrap();
        assert_eq!(persistent.size, Some(Quantity("32Gi".to_string())));
        assert!(persistent.access_modes.is_empty());
        assert!(root.cache_strategy.is_none());
        assert!(platform.network_interface_multi_queue.is_none());
    }

    #[test]
    fn test_example_template_only_keeps_non_default_settings() {
        let mut options = base_options();
        options.network_interface_multi_queue = Some(MultiQueueSetting::Disable);
        options.qos_class = Some(QoSClass::Burstable);
        let platform = example_kubevirt_template(&options).unwrap();
        assert!(platform.network_interface_multi_queue.is_none());
        assert!(platform.compute.unwrap().qos_class.is_none());

        options.network_interface_multi_queue = Some(MultiQueueSetting::Enable);
        options.qos_class = Some(QoSClass::Guaranteed);
        let platform = example_kubevirt_template(&options).unwrap();
        assert_eq!(
            platform.network_interface_multi_queue,
            Some(MultiQueueSetting::Enable)
        );
        assert_eq!(platform.compute.unwrap().qos_class, Some(QoSClass::Guaranteed));
    }

    #[test]
    fn test_example_template_storage_options() {
        let mut options = base_options();
        options.root_volume_storage_class = Some("ocs-storagecluster-ceph-rbd".to_string());
        options.root_volume_access_modes = Some("ReadWriteMany,ReadWriteOnce".to_string());
        options.root_volume_volume_mode = Some("Block".to_string());
        options.cache_strategy_type = Some("None".to_string());

        let root = example_kubevirt_template(&options)
            .unwrap()
            .root_volume
            .unwrap();
        let persistent = root.volume.persistent.unwrap();
        assert_eq!(
            persistent.storage_class.as_deref(),
            Some("ocs-storagecluster-ceph-rbd")
        );
        assert_eq!(
            persistent.access_modes,
            vec![
                PersistentVolumeAccessMode::ReadWriteMany,
                PersistentVolumeAccessMode::ReadWriteOnce
            ]
        );
        assert_eq!(persistent.volume_mode.as_deref(), Some("Block"));
        assert_eq!(
            root.cache_strategy.unwrap().strategy_type,
            KubevirtCachingStrategyType::None
        );
    }

    #[test]
    fn test_example_template_rejects_bad_access_mode() {
        let mut options = base_options();
        options.root_volume_access_modes = Some("ReadWriteMany,Sometimes".to_string());
        assert!(matches!(
            example_kubevirt_template(&options),
            Err(FixtureError::InvalidAccessMode(_))
        ));
    }

    #[test]
    fn test_unknown_cache_strategy_is_left_unset() {
        let mut options = base_options();
        options.cache_strategy_type = Some("Snapshot".to_string());
        let root = example_kubevirt_template(&options)
            .unwrap()
            .root_volume
            .unwrap();
        assert!(root.cache_strategy.is_none());

        options.cache_strategy_type = Some("PVC".to_string());
        let root = example_kubevirt_template(&options)
            .unwrap()
            .root_volume
            .unwrap();
        assert_eq!(
            root.cache_strategy.unwrap().strategy_type,
            KubevirtCachingStrategyType::Pvc
        );
    }
}
