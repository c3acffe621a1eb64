//! Boot volume models
//!
//! `BootVolume` is the store-neutral view of a materialized boot disk (a CDI
//! DataVolume). Only metadata the cache logic indexes on is carried, plus the
//! source and storage request for inspection.

use chrono::{DateTime, Utc};
use crds::{DataVolume, DataVolumeSource, DataVolumeSpec, StorageSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use std::collections::BTreeMap;

/// A materialized boot volume
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BootVolume {
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// Server-assigned creation time
    pub creation_timestamp: Option<DateTime<Utc>>,
    /// Deletion has been requested and is in progress
    pub deleting: bool,
    pub source: Option<DataVolumeSource>,
    pub storage: Option<StorageSpec>,
}

impl BootVolume {
    /// Value of a label, if present
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Value of an annotation, if present
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Build from a DataVolume; objects without a name or namespace are skipped
    pub fn from_data_volume(dv: &DataVolume) -> Option<Self> {
        let metadata = &dv.metadata;
        Some(Self {
            namespace: metadata.namespace.clone()?,
            name: metadata.name.clone()?,
            labels: metadata.labels.clone().unwrap_or_default(),
            annotations: metadata.annotations.clone().unwrap_or_default(),
            creation_timestamp: metadata.creation_timestamp.as_ref().and_then(time_to_utc),
            deleting: metadata.deletion_timestamp.is_some(),
            source: dv.spec.source.clone(),
            storage: dv.spec.storage.clone(),
        })
    }
}

/// Request to create a boot volume with a server-generated name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewBootVolume {
    pub namespace: String,
    /// Name prefix; the store appends a unique suffix
    pub generate_name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub source: DataVolumeSource,
    pub storage: StorageSpec,
}

impl NewBootVolume {
    /// Render as a DataVolume ready to be posted
    pub fn to_data_volume(&self) -> DataVolume {
        let mut dv = DataVolume::new(
            "",
            DataVolumeSpec {
                source: Some(self.source.clone()),
                storage: Some(self.storage.clone()),
            },
        );
        dv.metadata = ObjectMeta {
            generate_name: Some(self.generate_name.clone()),
            namespace: Some(self.namespace.clone()),
            labels: Some(self.labels.clone()),
            annotations: Some(self.annotations.clone()),
            ..Default::default()
        };
        dv
    }
}

/// Convert an apimachinery timestamp through its RFC 3339 wire form
fn time_to_utc(time: &Time) -> Option<DateTime<Utc>> {
    let value = serde_json::to_value(time).ok()?;
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
