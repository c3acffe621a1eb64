//! Controller configuration from environment variables.

use crate::error::ControllerError;
use kubevirt_nodepool::cluster_validation::{
    MIN_CNV_VERSION, MIN_KUBERNETES_VERSION, parse_version,
};
use semver::Version;
use std::net::SocketAddr;

const DEFAULT_CONCURRENCY: u16 = 3;
const DEFAULT_PROBE_ADDR: &str = "0.0.0.0:8080";

/// Runtime configuration of the NodePool Controller
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Namespace to watch NodePools in; all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Namespace for cached boot images; the hosted control plane
    /// namespace when unset
    pub boot_image_namespace: Option<String>,
    /// Maximum concurrent NodePool reconciliations
    pub concurrency: u16,
    pub min_cnv_version: Version,
    pub min_kubernetes_version: Version,
    /// Listen address of the probe and metrics server
    pub probe_addr: SocketAddr,
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through a key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let concurrency = match get("RECONCILE_CONCURRENCY") {
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(0) | Err(_) => {
                    return Err(ControllerError::InvalidConfig(format!(
                        "RECONCILE_CONCURRENCY must be a positive integer, got {:?}",
                        raw
                    )));
                }
                Ok(n) => n,
            },
            None => DEFAULT_CONCURRENCY,
        };

        let version = |key: &str, component: &'static str, default: Version| match get(key) {
            Some(raw) => parse_version(component, &raw)
                .map_err(|e| ControllerError::InvalidConfig(format!("{}: {}", key, e))),
            None => Ok(default),
        };

        let probe_addr_raw = get("PROBE_ADDR").unwrap_or_else(|| DEFAULT_PROBE_ADDR.to_string());
        let probe_addr = probe_addr_raw.parse::<SocketAddr>().map_err(|e| {
            ControllerError::InvalidConfig(format!("PROBE_ADDR {:?}: {}", probe_addr_raw, e))
        })?;

        Ok(Self {
            watch_namespace: get("WATCH_NAMESPACE"),
            boot_image_namespace: get("BOOT_IMAGE_NAMESPACE"),
            concurrency,
            min_cnv_version: version("MIN_INFRA_CNV_VERSION", "cnv", MIN_CNV_VERSION)?,
            min_kubernetes_version: version(
                "MIN_INFRA_K8S_VERSION",
                "kubernetes",
                MIN_KUBERNETES_VERSION,
            )?,
            probe_addr,
        })
    }
}
