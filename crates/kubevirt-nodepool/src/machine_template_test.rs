//! Unit tests for machine template synthesis

use super::*;
use crate::boot_image::{CachedBootImage, ImageLocator};
use crds::fixtures::{ExampleKubevirtOptions, example_kubevirt_template};
use crds::{DataVolumeSource, DataVolumeSourcePvc, InterfaceBridge, PodNetwork, StorageSpec};

const POOL: &str = "my-pool";
const INFRA_ID: &str = "1234";
const CACHE_NAMESPACE: &str = "hostedClusterNamespace";
const VOLUME: &str = "kv-boot-image-cache-12345";

fn options() -> ExampleKubevirtOptions {
    ExampleKubevirtOptions {
        memory: Some("5Gi".to_string()),
        cores: 4,
        image: Some("testimage".to_string()),
        root_volume_size: 32,
        ..Default::default()
    }
}

fn cached_image() -> BootImage {
    BootImage::Cached(
        CachedBootImage::new(ImageLocator::registry("testimage"), "imageHash", CACHE_NAMESPACE)
            .with_volume_name(VOLUME),
    )
}

fn synthesize(options: &ExampleKubevirtOptions) -> VirtualMachineTemplateSpec {
    let platform = example_kubevirt_template(options).unwrap();
    machine_template_spec(&platform, &cached_image(), INFRA_ID, POOL)
        .template
        .spec
        .virtual_machine_template
}

fn domain_of(template: &VirtualMachineTemplateSpec) -> &DomainSpec {
    &template.spec.template.as_ref().unwrap().spec.domain
}

/// The template every pool gets, before compute and storage options
fn base_template() -> VirtualMachineTemplateSpec {
    let labels = BTreeMap::from([
        (NODE_POOL_NAME_LABEL.to_string(), POOL.to_string()),
        (INFRA_ID_LABEL.to_string(), INFRA_ID.to_string()),
    ]);

    VirtualMachineTemplateSpec {
        metadata: ObjectMeta {
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: VirtualMachineSpec {
            run_strategy: Some(RunStrategy::Always),
            data_volume_templates: vec![DataVolumeTemplateSpec {
                metadata: ObjectMeta {
                    name: Some("rhcos".to_string()),
                    ..Default::default()
                },
                spec: DataVolumeSpec {
                    source: Some(DataVolumeSource {
                        pvc: Some(DataVolumeSourcePvc {
                            namespace: CACHE_NAMESPACE.to_string(),
                            name: VOLUME.to_string(),
                        }),
                        ..Default::default()
                    }),
                    storage: None,
                },
            }],
            template: Some(VirtualMachineInstanceTemplateSpec {
                metadata: ObjectMeta {
                    labels: Some(labels),
                    annotations: Some(BTreeMap::from([
                        (
                            "cluster-autoscaler.kubernetes.io/safe-to-evict-local-volumes"
                                .to_string(),
                            "private,public,sockets,virt-bin-share-dir,libvirt-runtime,ephemeral-disks,container-disks,hotplug-disks"
                                .to_string(),
                        ),
                        (
                            "kubevirt.io/allow-pod-bridge-network-live-migration".to_string(),
                            String::new(),
                        ),
                    ])),
                    ..Default::default()
                },
                spec: VirtualMachineInstanceSpec {
                    affinity: Some(Affinity {
                        pod_anti_affinity: Some(PodAntiAffinity {
                            preferred_during_scheduling_ignored_during_execution: Some(vec![
                                WeightedPodAffinityTerm {
                                    weight: 100,
                                    pod_affinity_term: PodAffinityTerm {
                                        label_selector: Some(LabelSelector {
                                            match_expressions: Some(vec![
                                                LabelSelectorRequirement {
                                                    key: "hypershift.openshift.io/nodePool"
                                                        .to_string(),
                                                    operator: "In".to_string(),
                                                    values: Some(vec![POOL.to_string()]),
                                                },
                                            ]),
                                            ..Default::default()
                                        }),
                                        topology_key: "kubernetes.io/hostname".to_string(),
                                        ..Default::default()
                                    },
                                },
                            ]),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    domain: DomainSpec {
                        devices: Devices {
                            disks: vec![Disk {
                                name: "rhcos".to_string(),
                                disk: Some(DiskTarget {
                                    bus: "virtio".to_string(),
                                }),
                            }],
                            interfaces: vec![Interface {
                                name: "default".to_string(),
                                bridge: Some(InterfaceBridge {}),
                            }],
                            network_interface_multi_queue: None,
                        },
                        ..Default::default()
                    },
                    networks: vec![Network {
                        name: "default".to_string(),
                        pod: Some(PodNetwork::default()),
                    }],
                    volumes: vec![Volume {
                        name: "rhcos".to_string(),
                        data_volume: Some(DataVolumeVolumeSource {
                            name: "rhcos".to_string(),
                        }),
                    }],
                },
            }),
        },
    }
}

fn with_storage(mut template: VirtualMachineTemplateSpec, size: &str) -> VirtualMachineTemplateSpec {
    let mut storage = StorageSpec::default();
    storage.set_storage_request(Quantity(size.to_string()));
    template.spec.data_volume_templates[0].spec.storage = Some(storage);
    template
}

fn domain_mut(template: &mut VirtualMachineTemplateSpec) -> &mut DomainSpec {
    &mut template.spec.template.as_mut().unwrap().spec.domain
}

#[test]
fn test_default_qos_sets_cpu_and_guest_memory() {
    let mut expected = with_storage(base_template(), "32Gi");
    let domain = domain_mut(&mut expected);
    domain.cpu = Some(Cpu { cores: 4 });
    domain.memory = Some(Memory {
        guest: Some(Quantity("5Gi".to_string())),
    });

    assert_eq!(synthesize(&options()), expected);
}

#[test]
fn test_guaranteed_qos_sets_requests_and_limits_only() {
    let mut opts = options();
    opts.qos_class = Some(QoSClass::Guaranteed);

    let mut expected = with_storage(base_template(), "32Gi");
    let resources = BTreeMap::from([
        ("cpu".to_string(), Quantity("4".to_string())),
        ("memory".to_string(), Quantity("5Gi".to_string())),
    ]);
    domain_mut(&mut expected).resources = Some(ResourceRequirements {
        requests: resources.clone(),
        limits: resources,
    });

    let template = synthesize(&opts);
    assert_eq!(template, expected);
    assert!(domain_of(&template).cpu.is_none());
    assert!(domain_of(&template).memory.is_none());
}

#[test]
fn test_multi_queue_only_present_when_enabled() {
    let mut opts = options();
    assert_eq!(
        domain_of(&synthesize(&opts)).devices.network_interface_multi_queue,
        None
    );

    opts.network_interface_multi_queue = Some(MultiQueueSetting::Disable);
    let template = synthesize(&opts);
    assert_eq!(domain_of(&template).devices.network_interface_multi_queue, None);
    let json = serde_json::to_value(domain_of(&template)).unwrap();
    assert!(json["devices"].get("networkInterfaceMultiqueue").is_none());

    opts.network_interface_multi_queue = Some(MultiQueueSetting::Enable);
    assert_eq!(
        domain_of(&synthesize(&opts)).devices.network_interface_multi_queue,
        Some(true)
    );
}

#[test]
fn test_multi_queue_disable_matches_unset() {
    let mut disabled = options();
    disabled.network_interface_multi_queue = Some(MultiQueueSetting::Disable);
    assert_eq!(synthesize(&disabled), synthesize(&options()));
}

#[test]
fn test_storage_options_are_copied_to_data_volume_template() {
    let mut opts = options();
    opts.root_volume_storage_class = Some("ocs-storagecluster-ceph-rbd".to_string());
    opts.root_volume_access_modes = Some("ReadWriteMany".to_string());
    opts.root_volume_volume_mode = Some("Block".to_string());
    opts.qos_class = Some(QoSClass::Guaranteed);

    let template = synthesize(&opts);
    let storage = template.spec.data_volume_templates[0]
        .spec
        .storage
        .as_ref()
        .unwrap();
    assert_eq!(storage.storage_request(), Some(&Quantity("32Gi".to_string())));
    assert_eq!(
        storage.storage_class_name.as_deref(),
        Some("ocs-storagecluster-ceph-rbd")
    );
    assert_eq!(storage.access_modes, vec!["ReadWriteMany".to_string()]);
    assert_eq!(storage.volume_mode.as_deref(), Some("Block"));
}

#[test]
fn test_uncached_images_import_from_origin() {
    let platform = example_kubevirt_template(&options()).unwrap();

    let registry = machine_template_spec(
        &platform,
        &BootImage::Direct(ImageLocator::registry("quay.io/containerdisks/rhcos:4.14")),
        INFRA_ID,
        POOL,
    );
    let source = registry.template.spec.virtual_machine_template.spec.data_volume_templates[0]
        .spec
        .source
        .clone()
        .unwrap();
    assert_eq!(
        source.registry.unwrap().url.as_deref(),
        Some("docker://quay.io/containerdisks/rhcos:4.14")
    );

    let http = machine_template_spec(
        &platform,
        &BootImage::Direct(ImageLocator::http("https://images.example.com/rhcos.qcow2")),
        INFRA_ID,
        POOL,
    );
    let source = http.template.spec.virtual_machine_template.spec.data_volume_templates[0]
        .spec
        .source
        .clone()
        .unwrap();
    assert_eq!(source.http.unwrap().url, "https://images.example.com/rhcos.qcow2");
}

#[test]
fn test_synthesis_is_deterministic() {
    let platform = example_kubevirt_template(&options()).unwrap();
    let first = machine_template_spec(&platform, &cached_image(), INFRA_ID, POOL);
    let second = machine_template_spec(&platform, &cached_image(), INFRA_ID, POOL);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
