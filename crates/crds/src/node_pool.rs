//! NodePool CRD
//!
//! Desired state of a pool of worker nodes for a hosted cluster. Only the
//! KubeVirt platform block is modelled in detail; the reconciler consumes it
//! read-only.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label carrying the node pool name on generated virtual machines
pub const NODE_POOL_NAME_LABEL: &str = "hypershift.openshift.io/nodePool";

/// Label carrying the owning hosted cluster's infra id
pub const INFRA_ID_LABEL: &str = "hypershift.openshift.io/infra-id";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "hypershift.openshift.io",
    version = "v1beta1",
    kind = "NodePool",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolSpec {
    /// Name of the HostedCluster this pool belongs to (same namespace)
    pub cluster_name: String,

    /// Desired node count (owned by the scaling layer, not read here)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Platform specific configuration
    pub platform: NodePoolPlatform,
}

/// Infrastructure platform a cluster or node pool runs on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum PlatformType {
    #[serde(rename = "AWS")]
    Aws,
    #[serde(rename = "Azure")]
    Azure,
    #[serde(rename = "Agent")]
    Agent,
    #[serde(rename = "KubeVirt")]
    KubeVirt,
    #[default]
    #[serde(rename = "None")]
    None,
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlatformType::Aws => "AWS",
            PlatformType::Azure => "Azure",
            PlatformType::Agent => "Agent",
            PlatformType::KubeVirt => "KubeVirt",
            PlatformType::None => "None",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolPlatform {
    /// Platform type
    #[serde(rename = "type")]
    pub platform_type: PlatformType,

    /// KubeVirt specific settings, required when type is KubeVirt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubevirt: Option<KubevirtNodePoolPlatform>,
}

/// KubeVirt node pool platform: compute shape, root disk and networking
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtNodePoolPlatform {
    /// Root volume of each virtual machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_volume: Option<KubevirtRootVolume>,

    /// CPU and memory of each virtual machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute: Option<KubevirtCompute>,

    /// Multi-queue support on the virtual network interface
    #[serde(
        default,
        rename = "networkInterfaceMultiqueue",
        skip_serializing_if = "Option::is_none"
    )]
    pub network_interface_multi_queue: Option<MultiQueueSetting>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtCompute {
    /// Guest memory, e.g. "8Gi"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub memory: Option<Quantity>,

    /// Number of virtual CPU cores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<u32>,

    /// Resource QoS class of the virt-launcher pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qos_class: Option<QoSClass>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum QoSClass {
    Burstable,
    Guaranteed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum MultiQueueSetting {
    Enable,
    Disable,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtRootVolume {
    /// Boot disk image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<KubevirtDiskImage>,

    #[serde(flatten)]
    pub volume: KubevirtVolume,

    /// How the boot image is cached on the infra cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_strategy: Option<KubevirtCachingStrategy>,
}

/// Where the boot disk image comes from
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtDiskImage {
    /// Container registry image holding the disk, e.g. "quay.io/containerdisks/rhcos:4.14"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_disk_image: Option<String>,

    /// HTTP(S) URL of a qcow2/raw disk image
    #[serde(default, rename = "httpURL", skip_serializing_if = "Option::is_none")]
    pub http_url: Option<String>,

    /// Content fingerprint of the image; derived from the locator when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum KubevirtVolumeType {
    #[default]
    Persistent,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtVolume {
    #[serde(rename = "type", default)]
    pub volume_type: KubevirtVolumeType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent: Option<KubevirtPersistentVolume>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtPersistentVolume {
    /// Requested size, e.g. "32Gi"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub size: Option<Quantity>,

    /// Infra cluster storage class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_modes: Vec<PersistentVolumeAccessMode>,

    /// "Filesystem" or "Block"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_mode: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum PersistentVolumeAccessMode {
    ReadWriteOnce,
    ReadWriteMany,
    ReadOnly,
    ReadWriteOncePod,
}

impl PersistentVolumeAccessMode {
    /// Kubernetes string form of the access mode
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistentVolumeAccessMode::ReadWriteOnce => "ReadWriteOnce",
            PersistentVolumeAccessMode::ReadWriteMany => "ReadWriteMany",
            PersistentVolumeAccessMode::ReadOnly => "ReadOnly",
            PersistentVolumeAccessMode::ReadWriteOncePod => "ReadWriteOncePod",
        }
    }
}

impl std::str::FromStr for PersistentVolumeAccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ReadWriteOnce" => Ok(Self::ReadWriteOnce),
            "ReadWriteMany" => Ok(Self::ReadWriteMany),
            "ReadOnly" => Ok(Self::ReadOnly),
            "ReadWriteOncePod" => Ok(Self::ReadWriteOncePod),
            other => Err(format!("unknown access mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum KubevirtCachingStrategyType {
    /// Import the image once per hosted cluster and clone it for each node
    #[default]
    #[serde(rename = "PVC")]
    Pvc,
    /// Import the image directly into every node's root volume
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtCachingStrategy {
    #[serde(rename = "type")]
    pub strategy_type: KubevirtCachingStrategyType,
}
