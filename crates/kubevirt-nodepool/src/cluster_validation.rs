//! Hosted cluster admission checks for the KubeVirt platform
//!
//! A hosted cluster can only run KubeVirt node pools when its platform block is
//! present and the infra cluster runs recent enough KubeVirt (CNV) and
//! Kubernetes releases.

use crate::error::ClusterValidationError;
use crds::{HostedCluster, PlatformType};
use semver::Version;
use tracing::debug;

/// Oldest supported KubeVirt (CNV) release on the infra cluster
pub const MIN_CNV_VERSION: Version = Version::new(1, 0, 0);

/// Oldest supported Kubernetes release on the infra cluster
pub const MIN_KUBERNETES_VERSION: Version = Version::new(1, 27, 0);

/// Versions reported by an infra cluster, as raw strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraVersions {
    /// KubeVirt version, e.g. "v1.1.0"
    pub cnv: String,
    /// Kubernetes API server version, e.g. "v1.28.3+k3s1"
    pub kubernetes: String,
}

/// Source of infra cluster versions
#[async_trait::async_trait]
pub trait InfraVersionProvider: Send + Sync {
    async fn infra_versions(
        &self,
        hosted_cluster: &HostedCluster,
    ) -> Result<InfraVersions, ClusterValidationError>;
}

/// Validates hosted clusters against infra cluster version gates
#[derive(Debug, Clone)]
pub struct ClusterValidator<P> {
    provider: P,
    min_cnv: Version,
    min_kubernetes: Version,
}

impl<P: InfraVersionProvider> ClusterValidator<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            min_cnv: MIN_CNV_VERSION,
            min_kubernetes: MIN_KUBERNETES_VERSION,
        }
    }

    /// Override the minimum versions
    pub fn with_minimums(mut self, min_cnv: Version, min_kubernetes: Version) -> Self {
        self.min_cnv = min_cnv;
        self.min_kubernetes = min_kubernetes;
        self
    }

    /// Check a hosted cluster; non-KubeVirt clusters always pass
    pub async fn validate(&self, hosted_cluster: &HostedCluster) -> Result<(), ClusterValidationError> {
        let platform = &hosted_cluster.spec.platform;
        if platform.platform_type != PlatformType::KubeVirt {
            return Ok(());
        }
        if platform.kubevirt.is_none() {
            return Err(ClusterValidationError::MissingKubevirtPlatform);
        }

        let versions = self.provider.infra_versions(hosted_cluster).await?;
        debug!(
            "Infra cluster versions: cnv={} kubernetes={}",
            versions.cnv, versions.kubernetes
        );

        check_minimum("cnv", &versions.cnv, &self.min_cnv)?;
        check_minimum("kubernetes", &versions.kubernetes, &self.min_kubernetes)
    }
}

fn check_minimum(
    component: &'static str,
    raw: &str,
    minimum: &Version,
) -> Result<(), ClusterValidationError> {
    let found = parse_version(component, raw)?;
    if &found < minimum {
        return Err(ClusterValidationError::UnsupportedVersion {
            component,
            found,
            minimum: minimum.clone(),
        });
    }
    Ok(())
}

/// Parse a release version, tolerating a leading `v` and a missing patch
/// component ("v1.27" reads as 1.27.0)
pub fn parse_version(component: &'static str, raw: &str) -> Result<Version, ClusterValidationError> {
    let trimmed = raw.trim().trim_start_matches('v');
    let core_end = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, rest) = trimmed.split_at(core_end);

    let normalized = if core.split('.').count() == 2 {
        format!("{}.0{}", core, rest)
    } else {
        trimmed.to_string()
    };

    Version::parse(&normalized).map_err(|source| ClusterValidationError::InvalidVersion {
        component,
        version: raw.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{HostedClusterSpec, KubevirtPlatformSpec, PlatformSpec};

    struct StaticVersions(InfraVersions);

    #[async_trait::async_trait]
    impl InfraVersionProvider for StaticVersions {
        async fn infra_versions(
            &self,
            _hosted_cluster: &HostedCluster,
        ) -> Result<InfraVersions, ClusterValidationError> {
            Ok(self.0.clone())
        }
    }

    fn validator(cnv: &str, kubernetes: &str) -> ClusterValidator<StaticVersions> {
        ClusterValidator::new(StaticVersions(InfraVersions {
            cnv: cnv.to_string(),
            kubernetes: kubernetes.to_string(),
        }))
    }

    fn hosted_cluster(kubevirt: Option<KubevirtPlatformSpec>) -> HostedCluster {
        let mut hc = HostedCluster::new(
            "cluster-under-test",
            HostedClusterSpec {
                infra_id: "infra-1234".to_string(),
                platform: PlatformSpec {
                    platform_type: PlatformType::KubeVirt,
                    kubevirt,
                },
            },
        );
        hc.metadata.namespace = Some("myns".to_string());
        hc
    }

    #[tokio::test]
    async fn test_supported_versions_pass() {
        let hc = hosted_cluster(Some(KubevirtPlatformSpec::default()));
        assert!(validator("1.0.0", "1.27.0").validate(&hc).await.is_ok());
        assert!(validator("v1.2.1", "v1.29.4+k3s1").validate(&hc).await.is_ok());
    }

    #[tokio::test]
    async fn test_old_cnv_is_rejected() {
        let hc = hosted_cluster(Some(KubevirtPlatformSpec::default()));
        let err = validator("0.111.0", "1.27.0").validate(&hc).await.unwrap_err();
        assert!(matches!(
            err,
            ClusterValidationError::UnsupportedVersion { component: "cnv", .. }
        ));
    }

    #[tokio::test]
    async fn test_old_kubernetes_is_rejected() {
        let hc = hosted_cluster(Some(KubevirtPlatformSpec::default()));
        let err = validator("1.0.0", "1.26.99").validate(&hc).await.unwrap_err();
        assert!(matches!(
            err,
            ClusterValidationError::UnsupportedVersion {
                component: "kubernetes",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_kubevirt_block_is_rejected() {
        let hc = hosted_cluster(None);
        assert!(matches!(
            validator("1.0.0", "1.27.0").validate(&hc).await,
            Err(ClusterValidationError::MissingKubevirtPlatform)
        ));
    }

    #[tokio::test]
    async fn test_other_platforms_skip_checks() {
        let mut hc = hosted_cluster(None);
        hc.spec.platform.platform_type = PlatformType::Aws;
        assert!(validator("garbage", "garbage").validate(&hc).await.is_ok());
    }

    #[tokio::test]
    async fn test_custom_minimums() {
        let hc = hosted_cluster(Some(KubevirtPlatformSpec::default()));
        let strict = validator("1.0.0", "1.27.0").with_minimums(Version::new(1, 1, 0), MIN_KUBERNETES_VERSION);
        assert!(strict.validate(&hc).await.is_err());
    }

    #[test]
    fn test_parse_version_forms() {
        assert_eq!(parse_version("kubernetes", "v1.27").unwrap(), Version::new(1, 27, 0));
        assert_eq!(
            parse_version("kubernetes", "v1.28.3+k3s1").unwrap().minor,
            28
        );
        assert!(parse_version("cnv", "1.1.0-rc.1").unwrap() < Version::new(1, 1, 0));
        assert!(matches!(
            parse_version("cnv", "not-a-version"),
            Err(ClusterValidationError::InvalidVersion { component: "cnv", .. })
        ));
    }
}
