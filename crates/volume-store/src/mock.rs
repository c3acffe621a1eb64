//! Mock volume store for unit testing
//!
//! Keeps volumes in memory, generates names the way the API server does for
//! `generateName`, and stamps creation times from a logical clock so ordering
//! is deterministic. Failures can be injected per operation, and every call is
//! recorded so tests can assert that nothing was written.

use crate::error::VolumeStoreError;
use crate::models::{BootVolume, NewBootVolume};
use crate::query::VolumeQuery;
use crate::volume_store_trait::VolumeStoreTrait;
use chrono::DateTime;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Epoch second the logical clock starts from
const CLOCK_BASE_SECS: i64 = 1_700_000_000;

/// A call made against the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List { namespace: String },
    Create { namespace: String, generate_name: String },
    Delete { namespace: String, name: String },
}

impl StoreCall {
    /// Whether the call mutates the store
    pub fn is_write(&self) -> bool {
        !matches!(self, StoreCall::List { .. })
    }
}

/// In-memory volume store
#[derive(Clone, Default)]
pub struct MockVolumeStore {
    volumes: Arc<Mutex<BTreeMap<(String, String), BootVolume>>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    fail_list: Arc<Mutex<Option<String>>>,
    fail_create: Arc<Mutex<Option<String>>>,
    fail_delete: Arc<Mutex<BTreeSet<String>>>,
    next_id: Arc<Mutex<u64>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockVolumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a volume to the mock store (for test setup)
    pub fn add_volume(&self, volume: BootVolume) {
        lock(&self.volumes).insert((volume.namespace.clone(), volume.name.clone()), volume);
    }

    /// All stored volumes, ordered by namespace then name
    pub fn volumes(&self) -> Vec<BootVolume> {
        lock(&self.volumes).values().cloned().collect()
    }

    /// Look up a single volume
    pub fn volume(&self, namespace: &str, name: &str) -> Option<BootVolume> {
        lock(&self.volumes)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        lock(&self.calls).clone()
    }

    /// Number of create and delete calls made so far
    pub fn write_count(&self) -> usize {
        lock(&self.calls).iter().filter(|c| c.is_write()).count()
    }

    /// Make every list call fail
    pub fn fail_list(&self, message: impl Into<String>) {
        *lock(&self.fail_list) = Some(message.into());
    }

    /// Make every create call fail
    pub fn fail_create(&self, message: impl Into<String>) {
        *lock(&self.fail_create) = Some(message.into());
    }

    /// Make deletes of the named volume fail
    pub fn fail_delete(&self, name: impl Into<String>) {
        lock(&self.fail_delete).insert(name.into());
    }

    /// Logical timestamp `offset_secs` after the clock base
    pub fn timestamp(offset_secs: i64) -> Option<DateTime<chrono::Utc>> {
        DateTime::from_timestamp(CLOCK_BASE_SECS + offset_secs, 0)
    }

    fn next_id(&self) -> u64 {
        let mut id = lock(&self.next_id);
        *id += 1;
        *id
    }

    fn record(&self, call: StoreCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait::async_trait]
impl VolumeStoreTrait for MockVolumeStore {
    async fn list_volumes(&self, query: &VolumeQuery) -> Result<Vec<BootVolume>, VolumeStoreError> {
        self.record(StoreCall::List {
            namespace: query.namespace.clone(),
        });

        if let Some(message) = lock(&self.fail_list).clone() {
            return Err(VolumeStoreError::Unavailable(message));
        }

        Ok(lock(&self.volumes)
            .values()
            .filter(|v| query.matches(v))
            .cloned()
            .collect())
    }

    async fn create_volume(&self, volume: NewBootVolume) -> Result<BootVolume, VolumeStoreError> {
        self.record(StoreCall::Create {
            namespace: volume.namespace.clone(),
            generate_name: volume.generate_name.clone(),
        });

        if let Some(message) = lock(&self.fail_create).clone() {
            return Err(VolumeStoreError::Unavailable(message));
        }
        if volume.namespace.is_empty() {
            return Err(VolumeStoreError::InvalidRequest(
                "namespace is required".to_string(),
            ));
        }

        let id = self.next_id();
        let created = BootVolume {
            namespace: volume.namespace,
            name: format!("{}{:05x}", volume.generate_name, id),
            labels: volume.labels,
            annotations: volume.annotations,
            creation_timestamp: Self::timestamp(id as i64 * 60),
            deleting: false,
            source: Some(volume.source),
            storage: Some(volume.storage),
        };

        self.add_volume(created.clone());
        Ok(created)
    }

    async fn delete_volume(&self, namespace: &str, name: &str) -> Result<(), VolumeStoreError> {
        self.record(StoreCall::Delete {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });

        if lock(&self.fail_delete).contains(name) {
            return Err(VolumeStoreError::Unavailable(format!(
                "delete of {}/{} rejected",
                namespace, name
            )));
        }

        lock(&self.volumes).remove(&(namespace.to_string(), name.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::{DataVolumeSource, StorageSpec};

    fn request(namespace: &str) -> NewBootVolume {
        NewBootVolume {
            namespace: namespace.to_string(),
            generate_name: "kv-boot-image-cache-".to_string(),
            labels: BTreeMap::from([("role".to_string(), "cache".to_string())]),
            annotations: BTreeMap::new(),
            source: DataVolumeSource::default(),
            storage: StorageSpec::default(),
        }
    }

    #[tokio::test]
    async fn test_create_generates_unique_names_and_ordered_timestamps() {
        let store = MockVolumeStore::new();
        let first = store.create_volume(request("ns")).await.unwrap();
        let second = store.create_volume(request("ns")).await.unwrap();

        assert!(first.name.starts_with("kv-boot-image-cache-"));
        assert_ne!(first.name, second.name);
        assert!(first.creation_timestamp < second.creation_timestamp);
        assert_eq!(store.volumes().len(), 2);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_list_filters_by_query() {
        let store = MockVolumeStore::new();
        store.create_volume(request("ns")).await.unwrap();
        store.create_volume(request("other")).await.unwrap();

        let query = VolumeQuery::in_namespace("ns").with_label("role", "cache");
        let listed = store.list_volumes(&query).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].namespace, "ns");

        let none = store
            .list_volumes(&VolumeQuery::in_namespace("ns").with_label("role", "other"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_volume_succeeds() {
        let store = MockVolumeStore::new();
        store.delete_volume("ns", "does-not-exist").await.unwrap();
        assert_eq!(
            store.calls(),
            vec![StoreCall::Delete {
                namespace: "ns".to_string(),
                name: "does-not-exist".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MockVolumeStore::new();
        let created = store.create_volume(request("ns")).await.unwrap();

        store.fail_delete(created.name.clone());
        assert!(store.delete_volume("ns", &created.name).await.is_err());
        assert!(store.volume("ns", &created.name).is_some());

        store.fail_list("etcd timeout");
        store.fail_create("quota exceeded");
        assert!(matches!(
            store.list_volumes(&VolumeQuery::in_namespace("ns")).await,
            Err(VolumeStoreError::Unavailable(_))
        ));
        assert!(store.create_volume(request("ns")).await.is_err());
    }
}
