//! Root volume storage requests

use crds::{KubevirtPersistentVolume, StorageSpec};

/// Storage request mirroring a persistent root volume
///
/// Returns `None` when the volume sets nothing, so templates do not carry an
/// empty storage block.
pub(crate) fn storage_spec(persistent: Option<&KubevirtPersistentVolume>) -> Option<StorageSpec> {
    let persistent = persistent?;
    let mut storage = StorageSpec::default();
    let mut populated = false;

    if let Some(size) = &persistent.size {
        storage.set_storage_request(size.clone());
        populated = true;
    }
    if let Some(class) = &persistent.storage_class {
        storage.storage_class_name = Some(class.clone());
        populated = true;
    }
    if !persistent.access_modes.is_empty() {
        storage.access_modes = persistent
            .access_modes
            .iter()
            .map(|mode| mode.as_str().to_string())
            .collect();
        populated = true;
    }
    if let Some(mode) = &persistent.volume_mode {
        storage.volume_mode = Some(mode.clone());
        populated = true;
    }

    populated.then_some(storage)
}
