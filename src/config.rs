use crate::model::ProfileState;
use crate::store::{DEFAULT_PROBE_KEY, FileBackend, MemoryBackend, PersistedStore};
use crate::todo::TODO_KEY;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub playground: PlaygroundConfig,
}

impl SiteConfig {
    pub fn validate(&self) -> Result<()> {
        if self.storage.probe_key.trim().is_empty() {
            bail!("storage.probe_key must not be empty");
        }
        let probe_key = &self.storage.probe_key;
        if probe_key.starts_with("progress-") || probe_key == TODO_KEY {
            bail!("storage.probe_key {probe_key} collides with a binding key");
        }
        if self.storage.backend == StorageBackend::File
            && self.storage.path.as_os_str().is_empty()
        {
            bail!("storage.path is required for the file backend");
        }
        if self.playground.profile.accent_color.trim().is_empty() {
            bail!("playground.profile.accentColor must not be empty");
        }
        Ok(())
    }

    /// Opens and probes the configured store. A backend that cannot even be
    /// opened degrades to an unavailable store, like a failed probe.
    pub fn open_store(&self) -> PersistedStore {
        let probe_key = &self.storage.probe_key;
        match self.storage.backend {
            StorageBackend::Memory => {
                PersistedStore::probe_with_key(Box::new(MemoryBackend::new()), probe_key)
            }
            StorageBackend::File => match FileBackend::open(&self.storage.path) {
                Ok(backend) => PersistedStore::probe_with_key(Box::new(backend), probe_key),
                Err(err) => {
                    warn!(
                        path = %self.storage.path.display(),
                        error = %err,
                        "storage file could not be opened; progress will not persist"
                    );
                    PersistedStore::unavailable()
                }
            },
            #[cfg(feature = "web")]
            StorageBackend::LocalStorage => PersistedStore::local_storage(probe_key),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteSection {
    #[serde(default = "default_site_root")]
    pub root: PathBuf,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            root: default_site_root(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
    /// The browser's `window.localStorage`.
    #[cfg(feature = "web")]
    LocalStorage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_probe_key")]
    pub probe_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: default_store_path(),
            probe_key: default_probe_key(),
        }
    }
}

/// What a numeric control does with text that is not a usable number.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NumericFallback {
    /// Drop the update; the field keeps its previous value.
    #[default]
    Reject,
    Zero,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct InputConfig {
    #[serde(default)]
    pub numeric_fallback: NumericFallback,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaygroundConfig {
    #[serde(default)]
    pub profile: ProfileState,
}

pub fn load_site_config(path: &Path) -> Result<SiteConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read site config: {}", path.display()))?;
    let config: SiteConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse toml in {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid site config {}", path.display()))?;
    Ok(config)
}

/// Loads `path` when given, otherwise the built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<SiteConfig> {
    match path {
        Some(path) => load_site_config(path),
        None => Ok(SiteConfig::default()),
    }
}

fn default_site_root() -> PathBuf {
    PathBuf::from("site")
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/state/storage.json")
}

fn default_probe_key() -> String {
    DEFAULT_PROBE_KEY.to_string()
}
