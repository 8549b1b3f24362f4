//! Flat key-value persistence for custom providers.
//!
//! The file store keeps a single JSON object; the custom provider list lives
//! under [`CUSTOM_PROVIDERS_KEY`]. Other keys in the file are preserved.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::model::Provider;

pub const CUSTOM_PROVIDERS_KEY: &str = "customProviders";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load/save contract for the custom provider list.
pub trait ProviderStore: Send + Sync {
    fn load(&self) -> Result<Vec<Provider>, StoreError>;
    fn save(&self, providers: &[Provider]) -> Result<(), StoreError>;
}

/// JSON file backed store. Writes go through a temp file in the same
/// directory and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_map(&self) -> Result<JsonMap<String, JsonValue>, StoreError> {
        if !self.path.exists() {
            return Ok(JsonMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.io_err(e))?;
        if content.trim().is_empty() {
            return Ok(JsonMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl ProviderStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Provider>, StoreError> {
        let mut map = self.read_map()?;
        match map.remove(CUSTOM_PROVIDERS_KEY) {
            Some(JsonValue::Null) | None => Ok(Vec::new()),
            Some(v) => Ok(serde_json::from_value(v)?),
        }
    }

    fn save(&self, providers: &[Provider]) -> Result<(), StoreError> {
        let mut map = match self.read_map() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("discarding unreadable store {}: {}", self.path.display(), e);
                JsonMap::new()
            }
        };
        map.insert(
            CUSTOM_PROVIDERS_KEY.to_string(),
            serde_json::to_value(providers)?,
        );
        let body = serde_json::to_vec_pretty(&JsonValue::Object(map))?;

        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.io_err(e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_err(e))?;
        std::io::Write::write_all(&mut tmp, &body).map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;
        tracing::debug!(
            "saved {} custom provider(s) to {}",
            providers.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// In-memory store. Clones share the same backing list.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Vec<Provider>>>,
}

impl MemoryStore {
    pub fn with_providers(providers: Vec<Provider>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(providers)),
        }
    }

    /// Current contents, as last saved.
    pub fn snapshot(&self) -> Vec<Provider> {
        match self.inner.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ProviderStore for MemoryStore {
    fn load(&self) -> Result<Vec<Provider>, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, providers: &[Provider]) -> Result<(), StoreError> {
        let mut guard = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = providers.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nope.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_under_single_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/store.json");
        let store = JsonFileStore::new(&path);
        let providers = vec![
            Provider::new("Acme", "acme/small", 0.5, 1.5),
            Provider::new("Acme", "acme/small", 0.5, 1.5),
        ];
        store.save(&providers).unwrap();

        let raw: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[CUSTOM_PROVIDERS_KEY][0]["inputCost"], 0.5);
        assert_eq!(store.load().unwrap(), providers);
    }

    #[test]
    fn save_preserves_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{"theme": "dark", "customProviders": []}"#).unwrap();
        let store = JsonFileStore::new(&path);
        store.save(&[Provider::new("x", "y", 1.0, 2.0)]).unwrap();

        let raw: JsonValue =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_file_is_an_error_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn memory_store_clones_share_state() {
        let store = MemoryStore::default();
        let handle = store.clone();
        store.save(&[Provider::new("a", "b", 0.0, 0.0)]).unwrap();
        assert_eq!(handle.snapshot().len(), 1);
    }
}
