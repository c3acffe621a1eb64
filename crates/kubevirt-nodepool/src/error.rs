//! Error types for node pool validation, boot image caching and cluster checks

use thiserror::Error;
use volume_store::VolumeStoreError;

/// A node pool platform is structurally incomplete
///
/// Terminal: retrying without a spec change cannot succeed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported platform type {found}: expected KubeVirt")]
    UnsupportedPlatform { found: String },

    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{field} is invalid: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    /// Path of the offending field, when the error is about a field
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::UnsupportedPlatform { .. } => Some("spec.platform.type"),
            ValidationError::MissingField { field } | ValidationError::InvalidField { field, .. } => {
                Some(*field)
            }
        }
    }
}

/// The boot image cache could not produce a volume reference
#[derive(Debug, Error)]
pub enum BootImageError {
    #[error("failed to list boot image volumes in {namespace}: {source}")]
    List {
        namespace: String,
        #[source]
        source: VolumeStoreError,
    },

    #[error("failed to create boot image volume in {namespace}: {source}")]
    Create {
        namespace: String,
        #[source]
        source: VolumeStoreError,
    },
}

/// A single stale volume that could not be deleted
#[derive(Debug, Error)]
#[error("{namespace}/{name}: {source}")]
pub struct CleanupFailure {
    pub namespace: String,
    pub name: String,
    #[source]
    pub source: VolumeStoreError,
}

/// Stale volumes left behind by a cache call
///
/// Non-fatal: the volume reference is still valid and the next reconcile
/// retries the deletions.
#[derive(Debug, Error)]
#[error("failed to delete {} stale boot image volume(s): {}", .failures.len(), join_failures(.failures))]
pub struct CleanupError {
    pub failures: Vec<CleanupFailure>,
}

fn join_failures(failures: &[CleanupFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A hosted cluster cannot run KubeVirt node pools on its infra cluster
#[derive(Debug, Error)]
pub enum ClusterValidationError {
    #[error("the spec.platform.kubevirt field is missing in the HostedCluster resource")]
    MissingKubevirtPlatform,

    #[error("infra cluster version provider failed: {0}")]
    Provider(String),

    #[error("failed to parse {component} version {version:?}: {source}")]
    InvalidVersion {
        component: &'static str,
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("infrastructure kubevirt cluster has wrong {component} version {found}, expecting {minimum} or above")]
    UnsupportedVersion {
        component: &'static str,
        found: semver::Version,
        minimum: semver::Version,
    },
}
