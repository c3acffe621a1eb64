//! Machine template synthesis
//!
//! Pure mapping from a validated KubeVirt node pool platform and its boot
//! image to the CAPK machine template that every machine of the pool is
//! instantiated from. The same inputs always produce the same template; all
//! maps are ordered so the serialized form is stable too.

use crate::boot_image::BootImage;
use crate::storage::storage_spec;
use crds::{
    Cpu, DataVolumeSpec, DataVolumeTemplateSpec, DataVolumeVolumeSource, Devices, Disk,
    DiskTarget, DomainSpec, INFRA_ID_LABEL, Interface, KubevirtMachineSpec,
    KubevirtMachineTemplateResource, KubevirtMachineTemplateSpec, KubevirtNodePoolPlatform,
    Memory, MultiQueueSetting, NODE_POOL_NAME_LABEL, Network, QoSClass, ResourceRequirements,
    RunStrategy, VirtualMachineInstanceSpec, VirtualMachineInstanceTemplateSpec,
    VirtualMachineSpec, VirtualMachineTemplateSpec, Volume,
};
use k8s_openapi::api::core::v1::{Affinity, PodAffinityTerm, PodAntiAffinity, WeightedPodAffinityTerm};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    LabelSelector, LabelSelectorRequirement, ObjectMeta,
};
use std::collections::BTreeMap;

/// Name shared by the root disk, its volume and its data volume template
pub const ROOT_VOLUME_NAME: &str = "rhcos";

/// Annotation listing the virt-launcher volumes the autoscaler may evict
pub const SAFE_TO_EVICT_LOCAL_VOLUMES_ANNOTATION: &str =
    "cluster-autoscaler.kubernetes.io/safe-to-evict-local-volumes";

/// Annotation allowing live migration over the pod bridge network
pub const ALLOW_POD_BRIDGE_LIVE_MIGRATION_ANNOTATION: &str =
    "kubevirt.io/allow-pod-bridge-network-live-migration";

/// Local volumes of the virt-launcher pod
pub const LOCAL_STORAGE_VOLUMES: [&str; 8] = [
    "private",
    "public",
    "sockets",
    "virt-bin-share-dir",
    "libvirt-runtime",
    "ephemeral-disks",
    "container-disks",
    "hotplug-disks",
];

const ANTI_AFFINITY_WEIGHT: i32 = 100;
const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

/// Build the machine template for a node pool
///
/// `owner_id` is the infra id of the hosted cluster and `pool_name` the
/// NodePool name; both are stamped as labels on the VM and VMI templates.
pub fn machine_template_spec(
    platform: &KubevirtNodePoolPlatform,
    boot_image: &BootImage,
    owner_id: &str,
    pool_name: &str,
) -> KubevirtMachineTemplateSpec {
    KubevirtMachineTemplateSpec {
        template: KubevirtMachineTemplateResource {
            spec: KubevirtMachineSpec {
                virtual_machine_template: virtual_machine_template(
                    platform, boot_image, owner_id, pool_name,
                ),
            },
        },
    }
}

fn virtual_machine_template(
    platform: &KubevirtNodePoolPlatform,
    boot_image: &BootImage,
    owner_id: &str,
    pool_name: &str,
) -> VirtualMachineTemplateSpec {
    let labels = BTreeMap::from([
        (NODE_POOL_NAME_LABEL.to_string(), pool_name.to_string()),
        (INFRA_ID_LABEL.to_string(), owner_id.to_string()),
    ]);

    let annotations = BTreeMap::from([
        (
            SAFE_TO_EVICT_LOCAL_VOLUMES_ANNOTATION.to_string(),
            LOCAL_STORAGE_VOLUMES.join(","),
        ),
        (ALLOW_POD_BRIDGE_LIVE_MIGRATION_ANNOTATION.to_string(), String::new()),
    ]);

    let persistent = platform
        .root_volume
        .as_ref()
        .and_then(|root| root.volume.persistent.as_ref());

    VirtualMachineTemplateSpec {
        metadata: ObjectMeta {
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: VirtualMachineSpec {
            run_strategy: Some(RunStrategy::Always),
            data_volume_templates: vec![DataVolumeTemplateSpec {
                metadata: ObjectMeta {
                    name: Some(ROOT_VOLUME_NAME.to_string()),
                    ..Default::default()
                },
                spec: DataVolumeSpec {
                    source: Some(boot_image.data_volume_source()),
                    storage: storage_spec(persistent),
                },
            }],
            template: Some(VirtualMachineInstanceTemplateSpec {
                metadata: ObjectMeta {
                    labels: Some(labels),
                    annotations: Some(annotations),
                    ..Default::default()
                },
                spec: VirtualMachineInstanceSpec {
                    domain: domain(platform),
                    affinity: Some(pool_anti_affinity(pool_name)),
                    networks: vec![Network::default_pod()],
                    volumes: vec![Volume {
                        name: ROOT_VOLUME_NAME.to_string(),
                        data_volume: Some(DataVolumeVolumeSource {
                            name: ROOT_VOLUME_NAME.to_string(),
                        }),
                    }],
                },
            }),
        },
    }
}

fn domain(platform: &KubevirtNodePoolPlatform) -> DomainSpec {
    let mut domain = DomainSpec {
        devices: Devices {
            disks: vec![Disk {
                name: ROOT_VOLUME_NAME.to_string(),
                disk: Some(DiskTarget {
                    bus: "virtio".to_string(),
                }),
            }],
            interfaces: vec![Interface::default_bridge()],
            network_interface_multi_queue: (platform.network_interface_multi_queue
                == Some(MultiQueueSetting::Enable))
            .then_some(true),
        },
        ..Default::default()
    };

    let Some(compute) = platform.compute.as_ref() else {
        return domain;
    };

    if compute.qos_class == Some(QoSClass::Guaranteed) {
        // Requests equal to limits put the virt-launcher pod in the Guaranteed class
        let mut resources = BTreeMap::new();
        if let Some(memory) = &compute.memory {
            resources.insert("memory".to_string(), memory.clone());
        }
        if let Some(cores) = compute.cores {
            resources.insert("cpu".to_string(), Quantity(cores.to_string()));
        }
        domain.resources = Some(ResourceRequirements {
            requests: resources.clone(),
            limits: resources,
        });
    } else {
        domain.cpu = compute.cores.map(|cores| Cpu { cores });
        domain.memory = compute.memory.as_ref().map(|memory| Memory {
            guest: Some(memory.clone()),
        });
    }

    domain
}

/// Prefer spreading a pool's machines across infra nodes
fn pool_anti_affinity(pool_name: &str) -> Affinity {
    Affinity {
        pod_anti_affinity: Some(PodAntiAffinity {
            preferred_during_scheduling_ignored_during_execution: Some(vec![
                WeightedPodAffinityTerm {
                    weight: ANTI_AFFINITY_WEIGHT,
                    pod_affinity_term: PodAffinityTerm {
                        label_selector: Some(LabelSelector {
                            match_expressions: Some(vec![LabelSelectorRequirement {
                                key: NODE_POOL_NAME_LABEL.to_string(),
                                operator: "In".to_string(),
                                values: Some(vec![pool_name.to_string()]),
                            }]),
                            ..Default::default()
                        }),
                        topology_key: HOSTNAME_TOPOLOGY_KEY.to_string(),
                        ..Default::default()
                    },
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "machine_template_test.rs"]
mod machine_template_test;
