//! Kubernetes-backed volume store
//!
//! Boot volumes are CDI DataVolumes. Listing uses a label selector, creation
//! relies on `generateName`, deletion runs in the background so the owning
//! PVC is garbage collected by the API server.

use crate::error::VolumeStoreError;
use crate::models::{BootVolume, NewBootVolume};
use crate::query::VolumeQuery;
use crate::volume_store_trait::VolumeStoreTrait;
use crds::DataVolume;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::Client;
use tracing::{debug, warn};

/// DataVolume store backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeVolumeStore {
    client: Client,
}

impl KubeVolumeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<DataVolume> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait::async_trait]
impl VolumeStoreTrait for KubeVolumeStore {
    async fn list_volumes(&self, query: &VolumeQuery) -> Result<Vec<BootVolume>, VolumeStoreError> {
        let selector = query.label_selector();
        debug!(
            "Listing DataVolumes in {} with selector '{}'",
            query.namespace, selector
        );

        let mut params = ListParams::default();
        if !selector.is_empty() {
            params = params.labels(&selector);
        }

        let list = self.api(&query.namespace).list(&params).await?;
        let volumes = list
            .items
            .iter()
            .filter_map(BootVolume::from_data_volume)
            .collect::<Vec<_>>();

        debug!("Found {} DataVolumes in {}", volumes.len(), query.namespace);
        Ok(volumes)
    }

    async fn create_volume(&self, volume: NewBootVolume) -> Result<BootVolume, VolumeStoreError> {
        if volume.namespace.is_empty() {
            return Err(VolumeStoreError::InvalidRequest(
                "namespace is required to create a DataVolume".to_string(),
            ));
        }

        debug!(
            "Creating DataVolume {}* in {}",
            volume.generate_name, volume.namespace
        );

        let created = self
            .api(&volume.namespace)
            .create(&PostParams::default(), &volume.to_data_volume())
            .await?;

        BootVolume::from_data_volume(&created).ok_or_else(|| {
            VolumeStoreError::InvalidRequest(format!(
                "API server returned a DataVolume without a name for prefix {}",
                volume.generate_name
            ))
        })
    }

    async fn delete_volume(&self, namespace: &str, name: &str) -> Result<(), VolumeStoreError> {
        debug!("Deleting DataVolume {}/{}", namespace, name);

        match self
            .api(namespace)
            .delete(name, &DeleteParams::background())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                warn!("DataVolume {}/{} already gone", namespace, name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
