//! NodePool reconciliation.
//!
//! For every KubeVirt NodePool: validate the platform block, resolve the
//! owning HostedCluster, check the infra cluster, cache the boot image,
//! synthesize the machine template and server-side apply it as a
//! `KubevirtMachineTemplate` named after the pool in the hosted control plane
//! namespace.

use crate::backoff::BackoffTracker;
use crate::error::ControllerError;
use crate::infra::KubeInfraVersionProvider;
use crate::metrics::Metrics;
use crds::{
    HostedCluster, KubevirtMachineTemplate, KubevirtMachineTemplateSpec, KubevirtNodePoolPlatform,
    NodePool, PlatformType,
};
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use kubevirt_nodepool::{
    BootImage, CacheOutcome, ClusterValidator, ValidationError, machine_template_spec,
    validate_platform,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use volume_store::VolumeStoreTrait;

/// Field manager for server-side apply
pub const FIELD_MANAGER: &str = "kubevirt-nodepool-controller";

/// Where a node pool's artifacts live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Targets {
    /// Owner id stamped on boot volumes and machines
    pub infra_id: String,
    /// Namespace of the machine template
    pub control_plane_namespace: String,
    /// Namespace of the cached boot image volumes
    pub boot_image_namespace: String,
}

/// Resolve the artifact locations for a hosted cluster
pub fn resolve_targets(
    hosted_cluster: &HostedCluster,
    boot_image_namespace: Option<&str>,
) -> Result<Targets, ControllerError> {
    let hc_name = hosted_cluster.metadata.name.as_deref().unwrap_or_default();

    if hosted_cluster
        .spec
        .platform
        .kubevirt
        .as_ref()
        .is_some_and(|kv| kv.credentials.is_some())
    {
        return Err(ControllerError::InvalidConfig(format!(
            "HostedCluster {} uses an external infra cluster, which this controller does not manage",
            hc_name
        )));
    }

    if hosted_cluster.spec.infra_id.is_empty() {
        return Err(ControllerError::HostedClusterNotReady(format!(
            "HostedCluster {} has no infraID yet",
            hc_name
        )));
    }

    let control_plane_namespace = hosted_cluster.control_plane_namespace().ok_or_else(|| {
        ControllerError::InvalidConfig(format!("HostedCluster {} missing namespace", hc_name))
    })?;

    Ok(Targets {
        infra_id: hosted_cluster.spec.infra_id.clone(),
        boot_image_namespace: boot_image_namespace
            .map(str::to_string)
            .unwrap_or_else(|| control_plane_namespace.clone()),
        control_plane_namespace,
    })
}

/// Cache the boot image (unless caching is off) and build the machine template
pub async fn materialize(
    store: &dyn VolumeStoreTrait,
    platform: &KubevirtNodePoolPlatform,
    targets: &Targets,
    pool_name: &str,
) -> Result<(KubevirtMachineTemplateSpec, Option<CacheOutcome>), ControllerError> {
    let mut boot_image = BootImage::from_platform(platform, &targets.boot_image_namespace)?;

    let outcome = match boot_image.as_cached_mut() {
        Some(cached) => Some(cached.cache_image(store, platform, &targets.infra_id).await?),
        None => {
            debug!("Boot image caching disabled for NodePool {}", pool_name);
            None
        }
    };

    let template = machine_template_spec(platform, &boot_image, &targets.infra_id, pool_name);
    Ok((template, outcome))
}

/// Reconciles KubeVirt NodePools.
pub struct Reconciler {
    client: Client,
    store: Arc<dyn VolumeStoreTrait>,
    cluster_validator: ClusterValidator<KubeInfraVersionProvider>,
    boot_image_namespace: Option<String>,
    metrics: Metrics,
    backoffs: BackoffTracker,
}

impl Reconciler {
    pub fn new(
        client: Client,
        store: Arc<dyn VolumeStoreTrait>,
        cluster_validator: ClusterValidator<KubeInfraVersionProvider>,
        boot_image_namespace: Option<String>,
        metrics: Metrics,
    ) -> Self {
        Self {
            client,
            store,
            cluster_validator,
            boot_image_namespace,
            metrics,
            backoffs: BackoffTracker::default(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn reconcile_node_pool(&self, node_pool: &NodePool) -> Result<(), ControllerError> {
        let name = node_pool
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidConfig("NodePool missing name".to_string()))?;
        let namespace = node_pool.metadata.namespace.as_deref().ok_or_else(|| {
            ControllerError::InvalidConfig(format!("NodePool {} missing namespace", name))
        })?;

        if node_pool.spec.platform.platform_type != PlatformType::KubeVirt {
            debug!(
                "Skipping NodePool {}/{} on platform {}",
                namespace, name, node_pool.spec.platform.platform_type
            );
            return Ok(());
        }

        info!("Reconciling NodePool {}/{}", namespace, name);

        validate_platform(node_pool)?;
        let platform = node_pool
            .spec
            .platform
            .kubevirt
            .as_ref()
            .ok_or(ValidationError::MissingField {
                field: "spec.platform.kubevirt",
            })?;

        let hosted_clusters: Api<HostedCluster> = Api::namespaced(self.client.clone(), namespace);
        let hosted_cluster = hosted_clusters
            .get_opt(&node_pool.spec.cluster_name)
            .await?
            .ok_or_else(|| {
                ControllerError::HostedClusterNotFound(format!(
                    "{}/{} (referenced by NodePool {})",
                    namespace, node_pool.spec.cluster_name, name
                ))
            })?;

        self.cluster_validator.validate(&hosted_cluster).await?;

        let targets = resolve_targets(&hosted_cluster, self.boot_image_namespace.as_deref())?;
        let (template, outcome) = materialize(self.store.as_ref(), platform, &targets, name).await?;

        if let Some(outcome) = &outcome {
            self.metrics.record_cache(outcome);
            if let Some(cleanup) = &outcome.cleanup {
                // Stale volumes are retried on the next resync
                warn!("NodePool {}/{}: {}", namespace, name, cleanup);
            }
        }

        self.apply_machine_template(&targets.control_plane_namespace, name, template)
            .await?;

        info!(
            "Applied KubevirtMachineTemplate {}/{} for NodePool {}/{}",
            targets.control_plane_namespace, name, namespace, name
        );
        Ok(())
    }

    async fn apply_machine_template(
        &self,
        namespace: &str,
        name: &str,
        spec: KubevirtMachineTemplateSpec,
    ) -> Result<(), ControllerError> {
        let api: Api<KubevirtMachineTemplate> = Api::namespaced(self.client.clone(), namespace);
        let mut template = KubevirtMachineTemplate::new(name, spec);
        template.metadata.namespace = Some(namespace.to_string());

        api.patch(
            name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&template),
        )
        .await?;
        Ok(())
    }

    /// Next requeue delay for a failing resource
    pub fn backoff_for_resource(&self, resource_key: &str) -> (Duration, u32) {
        self.backoffs.record_error(resource_key)
    }

    /// Reset error count for a resource (on successful reconciliation)
    pub fn reset_backoff(&self, resource_key: &str) {
        self.backoffs.reset(resource_key);
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod reconciler_test;
