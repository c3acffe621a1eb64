//! Node pool platform validation
//!
//! Structural checks run before anything is materialized. The checks stop at
//! the first problem and name the offending field path so the message can be
//! surfaced on the NodePool status as-is.

use crate::error::ValidationError;
use crds::{KubevirtNodePoolPlatform, NodePool, PlatformType};

/// Validate that a NodePool carries a complete KubeVirt platform block
pub fn validate_platform(node_pool: &NodePool) -> Result<(), ValidationError> {
    let platform = &node_pool.spec.platform;
    if platform.platform_type != PlatformType::KubeVirt {
        return Err(ValidationError::UnsupportedPlatform {
            found: platform.platform_type.to_string(),
        });
    }

    let kubevirt = platform
        .kubevirt
        .as_ref()
        .ok_or(ValidationError::MissingField {
            field: "spec.platform.kubevirt",
        })?;

    validate_kubevirt_platform(kubevirt)
}

/// Validate the KubeVirt platform block itself
pub fn validate_kubevirt_platform(
    platform: &KubevirtNodePoolPlatform,
) -> Result<(), ValidationError> {
    let compute = platform
        .compute
        .as_ref()
        .ok_or(ValidationError::MissingField {
            field: "spec.platform.kubevirt.compute",
        })?;

    match compute.cores {
        None => {
            return Err(ValidationError::MissingField {
                field: "spec.platform.kubevirt.compute.cores",
            });
        }
        Some(0) => {
            return Err(ValidationError::InvalidField {
                field: "spec.platform.kubevirt.compute.cores",
                reason: "must be greater than zero".to_string(),
            });
        }
        Some(_) => {}
    }

    match compute.memory.as_ref() {
        None => {
            return Err(ValidationError::MissingField {
                field: "spec.platform.kubevirt.compute.memory",
            });
        }
        Some(memory) if memory.0.trim().is_empty() => {
            return Err(ValidationError::InvalidField {
                field: "spec.platform.kubevirt.compute.memory",
                reason: "must not be empty".to_string(),
            });
        }
        Some(_) => {}
    }

    let root_volume = platform
        .root_volume
        .as_ref()
        .ok_or(ValidationError::MissingField {
            field: "spec.platform.kubevirt.rootVolume",
        })?;

    if root_volume.volume.persistent.is_none() {
        return Err(ValidationError::MissingField {
            field: "spec.platform.kubevirt.rootVolume.persistent",
        });
    }

    let image = root_volume
        .image
        .as_ref()
        .ok_or(ValidationError::MissingField {
            field: "spec.platform.kubevirt.rootVolume.image",
        })?;

    let container_disk = image
        .container_disk_image
        .as_deref()
        .is_some_and(|s| !s.is_empty());
    let http_url = image.http_url.as_deref().is_some_and(|s| !s.is_empty());

    match (container_disk, http_url) {
        (true, true) => Err(ValidationError::InvalidField {
            field: "spec.platform.kubevirt.rootVolume.image",
            reason: "containerDiskImage and httpURL are mutually exclusive".to_string(),
        }),
        (false, false) => Err(ValidationError::MissingField {
            field: "spec.platform.kubevirt.rootVolume.image",
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::fixtures::{ExampleKubevirtOptions, example_kubevirt_template};
    use crds::{NodePoolPlatform, NodePoolSpec};
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    fn node_pool(platform: Option<KubevirtNodePoolPlatform>) -> NodePool {
        NodePool::new(
            "my-pool",
            NodePoolSpec {
                cluster_name: "my-cluster".to_string(),
                replicas: None,
                platform: NodePoolPlatform {
                    platform_type: PlatformType::KubeVirt,
                    kubevirt: platform,
                },
            },
        )
    }

    fn valid_platform() -> KubevirtNodePoolPlatform {
        example_kubevirt_template(&ExampleKubevirtOptions {
            memory: Some("5Gi".to_string()),
            cores: 4,
            image: Some("testimage".to_string()),
            root_volume_size: 32,
            ..Default::default()
        })
        .unwrap()
    }

    fn field_of(platform: KubevirtNodePoolPlatform) -> Option<&'static str> {
        validate_platform(&node_pool(Some(platform)))
            .unwrap_err()
            .field()
    }

    #[test]
    fn test_valid_platform_passes() {
        assert_eq!(validate_platform(&node_pool(Some(valid_platform()))), Ok(()));
    }

    #[test]
    fn test_rejects_other_platform_types() {
        let mut pool = node_pool(Some(valid_platform()));
        pool.spec.platform.platform_type = PlatformType::Aws;
        assert_eq!(
            validate_platform(&pool),
            Err(ValidationError::UnsupportedPlatform {
                found: "AWS".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_missing_kubevirt_block() {
        assert_eq!(
            validate_platform(&node_pool(None)),
            Err(ValidationError::MissingField {
                field: "spec.platform.kubevirt"
            })
        );
    }

    #[test]
    fn test_rejects_missing_compute_fields() {
        let mut platform = valid_platform();
        platform.compute = None;
        assert_eq!(field_of(platform), Some("spec.platform.kubevirt.compute"));

        let mut platform = valid_platform();
        platform.compute.as_mut().unwrap().cores = None;
        assert_eq!(field_of(platform), Some("spec.platform.kubevirt.compute.cores"));

        let mut platform = valid_platform();
        platform.compute.as_mut().unwrap().cores = Some(0);
        assert!(matches!(
            validate_kubevirt_platform(&platform),
            Err(ValidationError::InvalidField { .. })
        ));

        let mut platform = valid_platform();
        platform.compute.as_mut().unwrap().memory = None;
        assert_eq!(field_of(platform), Some("spec.platform.kubevirt.compute.memory"));

        let mut platform = valid_platform();
        platform.compute.as_mut().unwrap().memory = Some(Quantity(" ".to_string()));
        assert_eq!(field_of(platform), Some("spec.platform.kubevirt.compute.memory"));
    }

    #[test]
    fn test_rejects_missing_root_volume_fields() {
        let mut platform = valid_platform();
        platform.root_volume = None;
        assert_eq!(field_of(platform), Some("spec.platform.kubevirt.rootVolume"));

        let mut platform = valid_platform();
        platform.root_volume.as_mut().unwrap().volume.persistent = None;
        assert_eq!(
            field_of(platform),
            Some("spec.platform.kubevirt.rootVolume.persistent")
        );

        let mut platform = valid_platform();
        platform.root_volume.as_mut().unwrap().image = None;
        assert_eq!(field_of(platform), Some("spec.platform.kubevirt.rootVolume.image"));
    }

    #[test]
    fn test_image_locator_must_be_exactly_one() {
        let mut platform = valid_platform();
        platform.root_volume.as_mut().unwrap().image = Some(crds::KubevirtDiskImage {
            container_disk_image: Some("testimage".to_string()),
            http_url: Some("https://images.example.com/rhcos.qcow2".to_string()),
            hash: None,
        });
        let err = validate_kubevirt_platform(&platform).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));

        let mut platform = valid_platform();
        platform.root_volume.as_mut().unwrap().image = Some(crds::KubevirtDiskImage {
            container_disk_image: Some(String::new()),
            http_url: None,
            hash: Some("abc".to_string()),
        });
        assert_eq!(
            validate_kubevirt_platform(&platform),
            Err(ValidationError::MissingField {
                field: "spec.platform.kubevirt.rootVolume.image"
            })
        );

        let mut platform = valid_platform();
        platform.root_volume.as_mut().unwrap().image = Some(crds::KubevirtDiskImage {
            container_disk_image: None,
            http_url: Some("https://images.example.com/rhcos.qcow2".to_string()),
            hash: None,
        });
        assert_eq!(validate_kubevirt_platform(&platform), Ok(()));
    }
}
