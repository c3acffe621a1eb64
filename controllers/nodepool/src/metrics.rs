//! Prometheus metrics for NodePool reconciliation.

use crate::error::ControllerError;
use kubevirt_nodepool::CacheOutcome;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Controller metrics, registered on a private registry
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconciliations: IntCounterVec,
    boot_volumes_created: IntCounter,
    boot_volumes_deleted: IntCounter,
    boot_volume_cleanup_failures: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, ControllerError> {
        let registry = Registry::new();

        let reconciliations = IntCounterVec::new(
            Opts::new(
                "nodepool_reconciliations_total",
                "NodePool reconciliations by result",
            ),
            &["result"],
        )?;
        let boot_volumes_created = IntCounter::new(
            "nodepool_boot_volumes_created_total",
            "Cached boot image volumes created",
        )?;
        let boot_volumes_deleted = IntCounter::new(
            "nodepool_boot_volumes_deleted_total",
            "Stale boot image volumes deleted",
        )?;
        let boot_volume_cleanup_failures = IntCounter::new(
            "nodepool_boot_volume_cleanup_failures_total",
            "Stale boot image volumes that could not be deleted",
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(boot_volumes_created.clone()))?;
        registry.register(Box::new(boot_volumes_deleted.clone()))?;
        registry.register(Box::new(boot_volume_cleanup_failures.clone()))?;

        Ok(Self {
            registry,
            reconciliations,
            boot_volumes_created,
            boot_volumes_deleted,
            boot_volume_cleanup_failures,
        })
    }

    pub fn record_success(&self) {
        self.reconciliations.with_label_values(&["success"]).inc();
    }

    pub fn record_failure(&self) {
        self.reconciliations.with_label_values(&["error"]).inc();
    }

    pub fn record_cache(&self, outcome: &CacheOutcome) {
        if outcome.created {
            self.boot_volumes_created.inc();
        }
        self.boot_volumes_deleted.inc_by(outcome.deleted.len() as u64);
        if let Some(cleanup) = &outcome.cleanup {
            self.boot_volume_cleanup_failures
                .inc_by(cleanup.failures.len() as u64);
        }
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String, ControllerError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("metrics are not UTF-8: {}", e)).into())
    }
}
