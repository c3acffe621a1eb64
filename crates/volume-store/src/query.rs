//! Label queries for boot volumes
//!
//! Labels and annotations are the only index the store offers. A `VolumeQuery`
//! is an explicit equality predicate over labels within one namespace; the
//! Kubernetes store renders it as a label selector, the mock evaluates it
//! directly.

use crate::models::BootVolume;
use std::collections::BTreeMap;

/// Namespace-scoped label equality query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VolumeQuery {
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
}

impl VolumeQuery {
    /// Query every volume in a namespace
    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Additionally require `key=value`
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Whether a volume satisfies the query
    pub fn matches(&self, volume: &BootVolume) -> bool {
        volume.namespace == self.namespace
            && self
                .labels
                .iter()
                .all(|(key, value)| volume.label(key) == Some(value.as_str()))
    }

    /// Kubernetes label selector form, e.g. `a=1,b=2`
    pub fn label_selector(&self) -> String {
        self.labels
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(namespace: &str, labels: &[(&str, &str)]) -> BootVolume {
        BootVolume {
            namespace: namespace.to_string(),
            name: "vol".to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_matches_requires_namespace_and_all_labels() {
        let query = VolumeQuery::in_namespace("ns").with_label("role", "cache");

        assert!(query.matches(&volume("ns", &[("role", "cache"), ("other", "x")])));
        assert!(!query.matches(&volume("other-ns", &[("role", "cache")])));
        assert!(!query.matches(&volume("ns", &[("role", "something-else")])));
        assert!(!query.matches(&volume("ns", &[])));
    }

    #[test]
    fn test_label_selector_is_sorted() {
        let query = VolumeQuery::in_namespace("ns")
            .with_label("z-key", "1")
            .with_label("a-key", "2");
        assert_eq!(query.label_selector(), "a-key=2,z-key=1");
        assert_eq!(VolumeQuery::in_namespace("ns").label_selector(), "");
    }
}
