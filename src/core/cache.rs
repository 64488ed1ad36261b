//! Response cache: a transient in-process map plus optional named persistent stores.
//!
//! Entries are keyed by absolute request URL and stamped with the time they
//! were written. An entry with an expiration is a miss once more than
//! `expirationTime` seconds have passed; expired persistent entries are
//! deleted when they are read.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::QueryError;
use crate::util::clock::{Clock, SystemClock};

/// Status and data of a cached response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// HTTP status of the stored response.
    pub status: u16,
    /// Stored resource.
    pub data: Value,
}

/// Bookkeeping stored next to each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    /// Write time in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Lifetime in seconds; `None` never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<u64>,
}

/// Stored cache record: `{status, data, _cacheInfo_: {timestamp, expirationTime}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// HTTP status of the stored response.
    pub status: u16,
    /// Stored resource.
    pub data: Value,
    /// Write time and lifetime.
    #[serde(rename = "_cacheInfo_")]
    pub cache_info: CacheInfo,
}

impl CacheEntry {
    /// Whether the entry has outlived its expiration at `now_ms`.
    #[must_use]
    pub const fn is_expired(&self, now_ms: u64) -> bool {
        match self.cache_info.expiration_time {
            Some(secs) => secs.saturating_mul(1000) < now_ms.saturating_sub(self.cache_info.timestamp),
            None => false,
        }
    }

    /// Status and data without the bookkeeping.
    #[must_use]
    pub fn into_response(self) -> CachedResponse {
        CachedResponse {
            status: self.status,
            data: self.data,
        }
    }
}

/// Options for cached lookups and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Persistent store to use; `None` selects the transient store.
    pub cache_name: Option<String>,
    /// Lifetime of written entries in seconds; `None` never expires.
    pub expiration_time_secs: Option<u64>,
}

impl CacheOptions {
    /// Transient cache, entries never expire.
    #[must_use]
    pub fn temporary() -> Self {
        Self::default()
    }

    /// Named persistent store.
    #[must_use]
    pub fn persistent(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: Some(cache_name.into()),
            expiration_time_secs: None,
        }
    }

    /// Set the lifetime of written entries.
    #[must_use]
    pub const fn with_expiration_secs(mut self, secs: u64) -> Self {
        self.expiration_time_secs = Some(secs);
        self
    }
}

/// Backend holding named persistent key-value stores.
///
/// Calls are blocking; [`ResponseCache`] runs them on the blocking pool.
/// Implement this trait for other backends (database, browser storage bridge).
pub trait CacheStore: Send + Sync {
    /// Read an entry from store `cache_name`.
    fn read(&self, cache_name: &str, key: &str) -> Result<Option<CacheEntry>, QueryError>;
    /// Write an entry into store `cache_name`, creating the store if needed.
    fn write(&self, cache_name: &str, key: &str, entry: &CacheEntry) -> Result<(), QueryError>;
    /// Remove one entry. Returns whether it existed.
    fn remove(&self, cache_name: &str, key: &str) -> Result<bool, QueryError>;
    /// Delete a whole store. Returns whether it existed.
    fn delete_store(&self, cache_name: &str) -> Result<bool, QueryError>;
    /// Names of all existing stores.
    fn list_stores(&self) -> Result<Vec<String>, QueryError>;
}

/// Shared response cache.
///
/// Hand the same `Arc<ResponseCache>` to every client that should share
/// results.
pub struct ResponseCache {
    transient: Mutex<HashMap<String, CacheEntry>>,
    persistent: Option<Arc<dyn CacheStore>>,
    clock: Arc<dyn Clock>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ResponseCache {
    /// Create a cache with an optional persistent backend.
    #[must_use]
    pub fn new(persistent: Option<Arc<dyn CacheStore>>) -> Self {
        Self::with_clock(persistent, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`.
    #[must_use]
    pub fn with_clock(persistent: Option<Arc<dyn CacheStore>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            transient: Mutex::new(HashMap::new()),
            persistent,
            clock,
        }
    }

    /// Whether named persistent stores are available.
    #[must_use]
    pub fn has_persistent_store(&self) -> bool {
        self.persistent.is_some()
    }

    /// Number of entries in the transient store, expired ones included.
    #[must_use]
    pub fn temporary_len(&self) -> usize {
        self.transient.lock().len()
    }

    fn store(&self) -> Result<Arc<dyn CacheStore>, QueryError> {
        self.persistent
            .clone()
            .ok_or_else(|| QueryError::Cache("no persistent cache store configured".into()))
    }

    async fn blocking<R, F>(&self, f: F) -> Result<R, QueryError>
    where
        R: Send + 'static,
        F: FnOnce(&dyn CacheStore) -> Result<R, QueryError> + Send + 'static,
    {
        let store = self.store()?;
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| {
                tracing::error!("cache store task failed: {}", e);
                QueryError::Cache(format!("cache task failed: {e}"))
            })?
    }

    /// Look up `url` in the transient store or in store `cache_name`.
    ///
    /// Misses and expired entries return `Ok(None)`. Expired entries are
    /// removed as a side effect.
    pub async fn get(
        &self,
        url: &str,
        cache_name: Option<&str>,
    ) -> Result<Option<CachedResponse>, QueryError> {
        let now = self.clock.now_ms();
        let Some(name) = cache_name else {
            let mut transient = self.transient.lock();
            return Ok(match transient.get(url) {
                Some(entry) if entry.is_expired(now) => {
                    transient.remove(url);
                    None
                }
                Some(entry) => Some(entry.clone().into_response()),
                None => None,
            });
        };

        let name = name.to_string();
        let key = url.to_string();
        let found = {
            let (name, key) = (name.clone(), key.clone());
            self.blocking(move |store| store.read(&name, &key)).await?
        };

        match found {
            Some(entry) if entry.is_expired(now) => {
                tracing::debug!(cache = %name, url = %key, "expired cache entry purged");
                self.blocking(move |store| store.remove(&name, &key)).await?;
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.into_response())),
            None => Ok(None),
        }
    }

    /// Store `response` for `url`, stamped with the current time.
    pub async fn add(
        &self,
        url: &str,
        response: CachedResponse,
        options: &CacheOptions,
    ) -> Result<(), QueryError> {
        let entry = CacheEntry {
            status: response.status,
            data: response.data,
            cache_info: CacheInfo {
                timestamp: self.clock.now_ms(),
                expiration_time: options.expiration_time_secs,
            },
        };

        match options.cache_name.clone() {
            None => {
                self.transient.lock().insert(url.to_string(), entry);
                Ok(())
            }
            Some(name) => {
                let key = url.to_string();
                self.blocking(move |store| store.write(&name, &key, &entry))
                    .await
            }
        }
    }

    /// Delete one persistent store. Returns whether it existed.
    pub async fn clear_by_cache_name(&self, cache_name: &str) -> Result<bool, QueryError> {
        let name = cache_name.to_string();
        let deleted = self
            .blocking(move |store| store.delete_store(&name))
            .await?;
        tracing::info!(cache = %cache_name, deleted, "persistent cache cleared");
        Ok(deleted)
    }

    /// Empty the transient store.
    pub fn clear_temporary_cache(&self) {
        self.transient.lock().clear();
        tracing::debug!("temporary cache cleared");
    }

    /// Delete every persistent store. Returns how many were deleted.
    ///
    /// Without a persistent backend this is a no-op returning `0`.
    pub async fn clear_persistent_cache(&self) -> Result<usize, QueryError> {
        if self.persistent.is_none() {
            return Ok(0);
        }
        let deleted = self
            .blocking(|store| {
                let mut deleted = 0;
                for name in store.list_stores()? {
                    if store.delete_store(&name)? {
                        deleted += 1;
                    }
                }
                Ok(deleted)
            })
            .await?;
        tracing::info!(deleted, "persistent caches cleared");
        Ok(deleted)
    }

    /// Delete every persistent store and empty the transient store.
    pub async fn clear_all(&self) -> Result<(), QueryError> {
        self.clear_temporary_cache();
        self.clear_persistent_cache().await.map(|_| ())
    }
}
