//! KubeVirt NodePool Controller
//!
//! Reconciles HyperShift NodePools on the KubeVirt platform:
//! - caches the root disk image as a CDI DataVolume per hosted cluster
//! - renders and applies the CAPK `KubevirtMachineTemplate` for the pool
//! - refuses pools whose infra cluster runs unsupported CNV or Kubernetes

mod backoff;
mod config;
mod controller;
mod error;
mod infra;
mod metrics;
mod probes;
mod reconciler;
mod watcher;

use crate::config::Config;
use controller::Controller;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting KubeVirt NodePool Controller");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!(
        "  Namespace: {}",
        config.watch_namespace.as_deref().unwrap_or("all namespaces")
    );
    info!(
        "  Boot image namespace: {}",
        config
            .boot_image_namespace
            .as_deref()
            .unwrap_or("hosted control plane namespace")
    );
    info!("  Concurrency: {}", config.concurrency);
    info!(
        "  Minimum infra versions: cnv {}, kubernetes {}",
        config.min_cnv_version, config.min_kubernetes_version
    );
    info!("  Probe address: {}", config.probe_addr);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
