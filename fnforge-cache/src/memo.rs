//! Namespaced memo table with write-through persistence

use dashmap::DashMap;
use fnforge_core::canonical_key;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::store::CacheStore;

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the table
    pub hits: u64,
    /// Lookups that had to compute
    pub misses: u64,
    /// Values added by `insert` or `get_or_compute`
    pub inserts: u64,
    /// Entries removed by `evict` or `clear`
    pub evictions: u64,
    /// Writes to the store that failed
    pub flush_failures: u64,
}

/// Memo table for one namespace.
///
/// Keys are canonical digests of the request that produced a value, so
/// structurally equal requests share an entry. Every change rewrites the
/// namespace document; concurrent writers are not coordinated and the last
/// flush wins.
pub struct MemoCache {
    namespace: String,
    store: Arc<dyn CacheStore>,
    entries: DashMap<String, Value>,
    stats: RwLock<CacheStats>,
}

impl MemoCache {
    /// Open a namespace. A missing or unreadable document gives an empty
    /// cache.
    pub async fn open(namespace: impl Into<String>, store: Arc<dyn CacheStore>) -> Self {
        let cache = Self {
            namespace: namespace.into(),
            store,
            entries: DashMap::new(),
            stats: RwLock::new(CacheStats::default()),
        };
        cache.reload().await;
        cache
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Replace the in-memory table with the store's current document
    pub async fn reload(&self) {
        self.entries.clear();
        match self.load_entries().await {
            Ok(entries) => {
                debug!(
                    namespace = %self.namespace,
                    entries = entries.len(),
                    "cache loaded"
                );
                for (key, value) in entries {
                    self.entries.insert(key, value);
                }
            }
            Err(e) => warn!(
                namespace = %self.namespace,
                location = %self.store.location(&self.namespace),
                error = %e,
                "ignoring unreadable cache"
            ),
        }
    }

    async fn load_entries(&self) -> Result<Vec<(String, Value)>> {
        let Some(document) = self.store.load(&self.namespace).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_str::<Vec<(String, Value)>>(&document).map_err(|e| {
            CacheError::Corrupt {
                namespace: self.namespace.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Key under which a request is stored
    pub fn key_for<K: Serialize + ?Sized>(key_source: &K) -> Result<String> {
        Ok(canonical_key(key_source)?)
    }

    /// Look up a request, counting a hit or a miss
    pub fn get<K, T>(&self, key_source: &K) -> Result<Option<T>>
    where
        K: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let key = Self::key_for(key_source)?;
        Ok(self.lookup(&key))
    }

    fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cached = self.entries.get(key).map(|entry| entry.value().clone());
        let found = cached.and_then(|value| match serde_json::from_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(namespace = %self.namespace, key, error = %e, "cached value has wrong shape");
                None
            }
        });

        let mut stats = self.stats.write();
        if found.is_some() {
            stats.hits += 1;
            debug!(namespace = %self.namespace, key, "cache hit");
        } else {
            stats.misses += 1;
            debug!(namespace = %self.namespace, key, "cache miss");
        }
        found
    }

    /// Return the cached value for `key_source`, or run `compute`, store
    /// its result and flush. Errors from `compute` are not cached.
    pub async fn get_or_compute<K, T, E, F, Fut>(&self, key_source: &K, compute: F) -> std::result::Result<T, E>
    where
        K: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = Self::key_for(key_source)?;
        if let Some(value) = self.lookup(&key) {
            return Ok(value);
        }

        let value = compute().await?;
        self.store_value(key, serde_json::to_value(&value).map_err(CacheError::from)?)
            .await;
        Ok(value)
    }

    /// Store a value for `key_source` and flush
    pub async fn insert<K, T>(&self, key_source: &K, value: &T) -> Result<()>
    where
        K: Serialize + ?Sized,
        T: Serialize + ?Sized,
    {
        let key = Self::key_for(key_source)?;
        self.store_value(key, serde_json::to_value(value)?).await;
        Ok(())
    }

    async fn store_value(&self, key: String, value: Value) {
        self.entries.insert(key, value);
        self.stats.write().inserts += 1;
        self.persist().await;
    }

    /// Remove the entry for `key_source`. Returns whether one existed.
    pub async fn evict<K: Serialize + ?Sized>(&self, key_source: &K) -> Result<bool> {
        let key = Self::key_for(key_source)?;
        Ok(self.evict_key(&key).await)
    }

    /// Remove an entry by its stored key
    pub async fn evict_key(&self, key: &str) -> bool {
        if self.entries.remove(key).is_none() {
            return false;
        }
        self.stats.write().evictions += 1;
        self.persist().await;
        true
    }

    /// Remove every entry of the namespace
    pub async fn clear(&self) {
        let removed = self.entries.len() as u64;
        self.entries.clear();
        self.stats.write().evictions += removed;
        debug!(namespace = %self.namespace, removed, "cache cleared");
        self.persist().await;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.read()
    }

    /// Write the whole table to the store, entries sorted by key
    pub async fn flush(&self) -> Result<()> {
        let mut entries: Vec<(String, Value)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let document = serde_json::to_string(&entries)?;
        self.store.save(&self.namespace, &document).await
    }

    async fn persist(&self) {
        if let Err(e) = self.flush().await {
            self.stats.write().flush_failures += 1;
            warn!(
                namespace = %self.namespace,
                location = %self.store.location(&self.namespace),
                error = %e,
                "failed to write cache"
            );
        }
    }
}

impl std::fmt::Debug for MemoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("namespace", &self.namespace)
            .field("entries", &self.entries.len())
            .field("stats", &self.stats())
            .finish()
    }
}
