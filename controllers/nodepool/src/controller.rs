//! Main controller implementation.
//!
//! Wires the Kubernetes client, the DataVolume-backed boot image store, the
//! infra cluster validator and the reconciler together, then runs the NodePool
//! watcher next to the probe server.

use crate::config::Config;
use crate::error::ControllerError;
use crate::infra::KubeInfraVersionProvider;
use crate::metrics::Metrics;
use crate::probes::{self, ProbeState};
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use crds::NodePool;
use kube::{Api, Client};
use kubevirt_nodepool::ClusterValidator;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use volume_store::KubeVolumeStore;

/// Main controller for KubeVirt NodePools.
pub struct Controller {
    node_pool_watcher: JoinHandle<Result<(), ControllerError>>,
    probe_server: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing NodePool Controller");

        let kube_client = Client::try_default().await?;

        let node_pool_api: Api<NodePool> = match config.watch_namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };

        let store = Arc::new(KubeVolumeStore::new(kube_client.clone()));
        let cluster_validator =
            ClusterValidator::new(KubeInfraVersionProvider::new(kube_client.clone()))
                .with_minimums(
                    config.min_cnv_version.clone(),
                    config.min_kubernetes_version.clone(),
                );
        let metrics = Metrics::new()?;

        let reconciler = Arc::new(Reconciler::new(
            kube_client,
            store,
            cluster_validator,
            config.boot_image_namespace.clone(),
            metrics.clone(),
        ));

        let probe_state = ProbeState::new(metrics);
        let probe_server = {
            let state = probe_state.clone();
            let addr = config.probe_addr;
            tokio::spawn(async move { probes::serve(addr, state).await })
        };

        let watcher = Watcher::new(reconciler, node_pool_api, config.concurrency);
        let node_pool_watcher = tokio::spawn(async move { watcher.watch_node_pools().await });
        probe_state.set_ready(true);

        Ok(Self {
            node_pool_watcher,
            probe_server,
        })
    }

    /// Runs until the watcher or the probe server exits.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("NodePool Controller running");

        tokio::select! {
            result = &mut self.node_pool_watcher => {
                self.probe_server.abort();
                Self::task_result("NodePool watcher", result)
            }
            result = &mut self.probe_server => {
                self.node_pool_watcher.abort();
                Self::task_result("Probe server", result)
            }
        }
    }

    fn task_result(
        task: &str,
        result: Result<Result<(), ControllerError>, tokio::task::JoinError>,
    ) -> Result<(), ControllerError> {
        match result {
            Ok(Ok(())) => {
                info!("{} exited", task);
                Ok(())
            }
            Ok(Err(e)) => {
                error!("{} failed: {}", task, e);
                Err(e)
            }
            Err(e) => {
                error!("{} panicked: {}", task, e);
                Err(ControllerError::Watch(format!("{} task failed: {}", task, e)))
            }
        }
    }
}
