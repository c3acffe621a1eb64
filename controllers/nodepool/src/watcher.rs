//! NodePool watcher.
//!
//! Drives reconciliation through `kube_runtime::Controller`, which handles
//! reconnection and queueing. Successful passes requeue on a fixed resync
//! interval so stale boot volumes left by a failed cleanup get another try.
//! Failures requeue with per-resource Fibonacci backoff, except terminal
//! ones, which wait for the NodePool to change.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::NodePool;
use futures::StreamExt;
use kube::{Api, Resource, ResourceExt};
use kube_runtime::{
    controller::{Action, Config as ControllerConfig},
    watcher, Controller,
};
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Requeue interval after a successful reconciliation
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(10 * 60);

const DEBOUNCE: Duration = Duration::from_secs(5);

type ReconcileFuture = Pin<Box<dyn Future<Output = Result<(), ControllerError>> + Send>>;

/// `namespace/name` key used for backoff bookkeeping
fn resource_key<K: Resource>(obj: &K) -> String {
    format!(
        "{}/{}",
        obj.namespace().unwrap_or_default(),
        obj.name_any()
    )
}

/// Run a controller for one resource kind until the watch stream ends
async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
    concurrency: u16,
) -> Result<(), ControllerError>
where
    K: Resource + Clone + Send + Sync + Debug + serde::de::DeserializeOwned + 'static,
    K::DynamicType: Default + Eq + std::hash::Hash + Clone + Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        ctx.metrics().record_failure();
        let key = resource_key(obj.as_ref());

        if error.is_terminal() {
            warn!(
                "{} {} cannot be reconciled until it changes: {}",
                resource_name, key, error
            );
            return Action::await_change();
        }

        let (delay, attempts) = ctx.backoff_for_resource(&key);
        error!(
            "Reconciliation error for {} {} (attempt {}), retrying in {:?}: {}",
            resource_name, key, attempts, delay, error
        );
        Action::requeue(delay)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            let key = resource_key(obj.as_ref());
            debug!("Reconciling {} {}", resource_name, key);

            reconcile_fn(ctx.clone(), obj).await?;

            ctx.reset_backoff(&key);
            ctx.metrics().record_success();
            Ok::<_, ControllerError>(Action::requeue(RESYNC_INTERVAL))
        }
    };

    let controller_config = ControllerConfig::default()
        .debounce(DEBOUNCE)
        .concurrency(concurrency);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled {} {}", resource_name, obj.name),
                Err(e) => error!("Controller error for {}: {}", resource_name, e),
            }
        })
        .await;

    info!("{} watcher stopped", resource_name);
    Ok(())
}

/// Watches NodePools and feeds them to the reconciler.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    node_pool_api: Api<NodePool>,
    concurrency: u16,
}

impl Watcher {
    pub fn new(reconciler: Arc<Reconciler>, node_pool_api: Api<NodePool>, concurrency: u16) -> Self {
        Self {
            reconciler,
            node_pool_api,
            concurrency,
        }
    }

    /// Watch NodePool resources until shutdown
    pub async fn watch_node_pools(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.node_pool_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| {
                Box::pin(async move { reconciler.reconcile_node_pool(&resource).await })
            },
            "NodePool",
            self.concurrency,
        )
        .await
    }
}
