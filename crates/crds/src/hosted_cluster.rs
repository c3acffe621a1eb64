//! HostedCluster CRD
//!
//! Only the fields the node pool reconciler reads are modelled: the infra id
//! that scopes boot image caches and the platform block checked at admission.

use crate::node_pool::PlatformType;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "hypershift.openshift.io",
    version = "v1beta1",
    kind = "HostedCluster",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct HostedClusterSpec {
    /// Unique identifier of the cluster's infrastructure
    #[serde(default, rename = "infraID")]
    pub infra_id: String,

    #[serde(default)]
    pub platform: PlatformSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSpec {
    #[serde(rename = "type")]
    pub platform_type: PlatformType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubevirt: Option<KubevirtPlatformSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtPlatformSpec {
    /// Use the infra cluster's base domain for the hosted cluster's ingress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_domain_passthrough: Option<bool>,

    /// External infra cluster; when unset the management cluster hosts the VMs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<KubevirtPlatformCredentials>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtPlatformCredentials {
    /// Namespace on the infra cluster where VMs and boot images live
    pub infra_namespace: String,

    /// Secret holding the infra cluster kubeconfig
    pub infra_kube_config_secret: KubeconfigSecretRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubeconfigSecretRef {
    pub name: String,
    pub key: String,
}

impl HostedCluster {
    /// Namespace of the hosted control plane: `{namespace}-{name}`
    pub fn control_plane_namespace(&self) -> Option<String> {
        let namespace = self.metadata.namespace.as_deref()?;
        let name = self.metadata.name.as_deref()?;
        Some(format!("{}-{}", namespace, name))
    }
}
