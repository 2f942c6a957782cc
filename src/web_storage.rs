use crate::store::{BackendError, KeyValueBackend, PersistedStore};
use tracing::warn;
use web_sys::Storage;

/// `window.localStorage` as a store backend, for wasm builds with the `web` feature.
pub struct LocalStorageBackend {
    storage: Storage,
}

impl LocalStorageBackend {
    pub fn from_window() -> Option<Self> {
        let storage = web_sys::window()?.local_storage().ok().flatten()?;
        Some(Self { storage })
    }
}

impl PersistedStore {
    /// Probes `window.localStorage`; unavailable when there is no window or
    /// the browser has storage disabled.
    pub fn local_storage(probe_key: &str) -> Self {
        match LocalStorageBackend::from_window() {
            Some(backend) => Self::probe_with_key(Box::new(backend), probe_key),
            None => {
                warn!("localStorage is not reachable; progress will not persist");
                Self::unavailable()
            }
        }
    }
}

impl KeyValueBackend for LocalStorageBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.storage
            .get_item(key)
            .map_err(|err| BackendError::Rejected(format!("{err:?}")))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        self.storage
            .set_item(key, value)
            .map_err(|err| BackendError::Rejected(format!("{err:?}")))
    }

    fn remove_item(&mut self, key: &str) -> Result<(), BackendError> {
        self.storage
            .remove_item(key)
            .map_err(|err| BackendError::Rejected(format!("{err:?}")))
    }
}
