//! In-memory persistent-store backend for tests and hosts without disk access.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::core::{CacheEntry, CacheStore, QueryError};

/// Named stores kept in process memory. Survives only as long as the value.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    stores: Mutex<HashMap<String, HashMap<String, CacheEntry>>>,
}

impl InMemoryCacheStore {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in store `cache_name`.
    #[must_use]
    pub fn entry_count(&self, cache_name: &str) -> usize {
        self.stores.lock().get(cache_name).map_or(0, HashMap::len)
    }
}

impl CacheStore for InMemoryCacheStore {
    fn read(&self, cache_name: &str, key: &str) -> Result<Option<CacheEntry>, QueryError> {
        Ok(self
            .stores
            .lock()
            .get(cache_name)
            .and_then(|store| store.get(key))
            .cloned())
    }

    fn write(&self, cache_name: &str, key: &str, entry: &CacheEntry) -> Result<(), QueryError> {
        self.stores
            .lock()
            .entry(cache_name.to_string())
            .or_default()
            .insert(key.to_string(), entry.clone());
        Ok(())
    }

    fn remove(&self, cache_name: &str, key: &str) -> Result<bool, QueryError> {
        Ok(self
            .stores
            .lock()
            .get_mut(cache_name)
            .is_some_and(|store| store.remove(key).is_some()))
    }

    fn delete_store(&self, cache_name: &str) -> Result<bool, QueryError> {
        Ok(self.stores.lock().remove(cache_name).is_some())
    }

    fn list_stores(&self) -> Result<Vec<String>, QueryError> {
        Ok(self.stores.lock().keys().cloned().collect())
    }
}
