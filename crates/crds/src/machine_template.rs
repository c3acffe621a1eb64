//! KubevirtMachineTemplate
//!
//! Cluster API Provider KubeVirt (CAPK) machine template. Owned by CAPK, so
//! only the client-side shape is defined.

use crate::kubevirt::VirtualMachineTemplateSpec;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1alpha1",
    kind = "KubevirtMachineTemplate",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtMachineTemplateSpec {
    pub template: KubevirtMachineTemplateResource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtMachineTemplateResource {
    pub spec: KubevirtMachineSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubevirtMachineSpec {
    pub virtual_machine_template: VirtualMachineTemplateSpec,
}
