//! Infra cluster version discovery.
//!
//! Node pool VMs run on the management cluster, so the infra versions are
//! those of the cluster the controller talks to: the API server version and
//! the version KubeVirt reports on its `KubeVirt` resource.

use crds::HostedCluster;
use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams};
use kube::Client;
use kubevirt_nodepool::{ClusterValidationError, InfraVersionProvider, InfraVersions};
use tracing::debug;

/// Reads infra versions through the Kubernetes API
#[derive(Clone)]
pub struct KubeInfraVersionProvider {
    client: Client,
}

impl KubeInfraVersionProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn cnv_version(&self) -> Result<String, ClusterValidationError> {
        let resource = ApiResource::from_gvk(&GroupVersionKind::gvk("kubevirt.io", "v1", "KubeVirt"));
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &resource);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| ClusterValidationError::Provider(format!("failed to list KubeVirt resources: {}", e)))?;

        observed_kubevirt_version(&list.items).ok_or_else(|| {
            ClusterValidationError::Provider(
                "no KubeVirt resource reports status.observedKubeVirtVersion".to_string(),
            )
        })
    }
}

#[async_trait::async_trait]
impl InfraVersionProvider for KubeInfraVersionProvider {
    async fn infra_versions(
        &self,
        _hosted_cluster: &HostedCluster,
    ) -> Result<InfraVersions, ClusterValidationError> {
        let kubernetes = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| ClusterValidationError::Provider(format!("failed to read API server version: {}", e)))?
            .git_version;
        let cnv = self.cnv_version().await?;

        debug!("Discovered infra versions: kubernetes={} cnv={}", kubernetes, cnv);
        Ok(InfraVersions { cnv, kubernetes })
    }
}

/// First version reported in `status.observedKubeVirtVersion`
fn observed_kubevirt_version(items: &[DynamicObject]) -> Option<String> {
    items.iter().find_map(|item| {
        item.data
            .get("status")?
            .get("observedKubeVirtVersion")?
            .as_str()
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}
