use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_PROBE_KEY: &str = "__test";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("storage is blocked")]
    Blocked,
    #[error("quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("storage rejected the operation: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum StoreFault {
    #[error("persistent storage is unavailable")]
    Unavailable,
    #[error("value stored at {key} is malformed")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("read of {key} failed")]
    ReadFailed {
        key: String,
        #[source]
        source: BackendError,
    },
    #[error("write of {key} was rejected")]
    WriteRejected {
        key: String,
        #[source]
        source: BackendError,
    },
    #[error("value for {key} could not be serialized")]
    Unserializable {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A flat string key-value namespace, shaped after the browser's `Storage`.
pub trait KeyValueBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), BackendError>;
    fn remove_item(&mut self, key: &str) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    items: BTreeMap<String, String>,
    quota_bytes: Option<usize>,
    blocked: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects any write that would push keys plus values past `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota_bytes: Some(bytes),
            ..Self::default()
        }
    }

    /// Every operation fails, like storage disabled in a private window.
    pub fn blocked() -> Self {
        Self {
            blocked: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn used_bytes_without(&self, key: &str) -> usize {
        self.items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError> {
        if self.blocked {
            return Err(BackendError::Blocked);
        }
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        if self.blocked {
            return Err(BackendError::Blocked);
        }
        if let Some(limit) = self.quota_bytes {
            let needed = self.used_bytes_without(key) + key.len() + value.len();
            if needed > limit {
                return Err(BackendError::QuotaExceeded { needed, limit });
            }
        }
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), BackendError> {
        if self.blocked {
            return Err(BackendError::Blocked);
        }
        self.items.remove(key);
        Ok(())
    }
}

/// Keeps the whole namespace in one JSON object file, rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl FileBackend {
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        let items = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            items,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(&self.items)?;
        std::fs::write(&self.path, serialized)?;
        Ok(())
    }
}

impl KeyValueBackend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        let previous = self.items.insert(key.to_string(), value.to_string());
        if let Err(err) = self.flush() {
            match previous {
                Some(old) => self.items.insert(key.to_string(), old),
                None => self.items.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), BackendError> {
        let Some(previous) = self.items.remove(key) else {
            return Ok(());
        };
        if let Err(err) = self.flush() {
            self.items.insert(key.to_string(), previous);
            return Err(err);
        }
        Ok(())
    }
}

/// Degrades to a no-op store when the backend fails its availability probe.
pub struct PersistedStore {
    backend: Option<Box<dyn KeyValueBackend>>,
}

impl PersistedStore {
    pub fn probe(backend: Box<dyn KeyValueBackend>) -> Self {
        Self::probe_with_key(backend, DEFAULT_PROBE_KEY)
    }

    pub fn probe_with_key(mut backend: Box<dyn KeyValueBackend>, probe_key: &str) -> Self {
        let probed = backend
            .set_item(probe_key, "ok")
            .and_then(|_| backend.remove_item(probe_key));

        match probed {
            Ok(()) => Self {
                backend: Some(backend),
            },
            Err(err) => {
                warn!(error = %err, "storage is not available; progress will not persist");
                Self::unavailable()
            }
        }
    }

    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    pub fn in_memory() -> Self {
        Self::probe(Box::new(MemoryBackend::new()))
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreFault> {
        let backend = self.backend.as_ref().ok_or(StoreFault::Unavailable)?;
        let raw = backend
            .get_item(key)
            .map_err(|source| StoreFault::ReadFailed {
                key: key.to_string(),
                source,
            })?;

        match raw {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StoreFault::Malformed {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    pub fn try_save<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
    ) -> Result<(), StoreFault> {
        let backend = self.backend.as_mut().ok_or(StoreFault::Unavailable)?;
        let serialized =
            serde_json::to_string(value).map_err(|source| StoreFault::Unserializable {
                key: key.to_string(),
                source,
            })?;
        backend
            .set_item(key, &serialized)
            .map_err(|source| StoreFault::WriteRejected {
                key: key.to_string(),
                source,
            })
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.try_load(key) {
            Ok(Some(value)) => value,
            Ok(None) | Err(StoreFault::Unavailable) => fallback,
            Err(fault) => {
                debug!(key, error = %fault, "stored value ignored; using fallback");
                fallback
            }
        }
    }

    pub fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        match self.try_save(key, value) {
            Ok(()) | Err(StoreFault::Unavailable) => {}
            Err(fault) => {
                debug!(key, error = %fault, "write dropped; in-memory state stays authoritative");
            }
        }
    }

    /// The raw stored string, bypassing decoding.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.backend
            .as_ref()
            .and_then(|backend| backend.get_item(key).ok())
            .flatten()
    }

    pub fn write_raw(&mut self, key: &str, value: &str) -> Result<(), StoreFault> {
        let backend = self.backend.as_mut().ok_or(StoreFault::Unavailable)?;
        backend
            .set_item(key, value)
            .map_err(|source| StoreFault::WriteRejected {
                key: key.to_string(),
                source,
            })
    }
}

impl std::fmt::Debug for PersistedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedStore")
            .field("available", &self.is_available())
            .finish()
    }
}
