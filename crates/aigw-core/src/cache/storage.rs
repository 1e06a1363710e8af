//! Cache storage implementations

use super::fingerprint::Fingerprint;
use super::types::{CacheEntry, CacheStatistics};
use crate::error::GatewayResult;
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;

/// Cache storage interface
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Get a live entry; expired entries read as a miss
    async fn get(&self, key: &Fingerprint) -> GatewayResult<Option<CacheEntry>>;

    /// Insert or replace an entry
    async fn set(&self, key: Fingerprint, entry: CacheEntry) -> GatewayResult<()>;

    async fn clear(&self) -> GatewayResult<()>;

    async fn statistics(&self) -> GatewayResult<CacheStatistics>;

    /// Drop expired entries, returning how many were removed
    async fn cleanup_expired(&self) -> GatewayResult<usize>;
}

#[derive(Debug)]
struct Inner {
    cache: LruCache<Fingerprint, CacheEntry>,
    stats: CacheStatistics,
}

impl Inner {
    fn drop_entry(&mut self, entry: &CacheEntry) {
        self.stats.size_bytes = self.stats.size_bytes.saturating_sub(entry.size_bytes as u64);
        self.stats.evictions += 1;
        self.stats.entry_count = self.cache.len();
    }
}

/// In-memory cache storage using LRU cache
#[derive(Debug)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    /// Create a new memory storage with specified capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                cache: LruCache::new(capacity),
                stats: CacheStatistics::default(),
            }),
        }
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn get(&self, key: &Fingerprint) -> GatewayResult<Option<CacheEntry>> {
        let mut inner = self.inner.lock().await;

        let Some(expired) = inner.cache.get(key).map(|entry| entry.is_expired()) else {
            inner.stats.misses += 1;
            return Ok(None);
        };

        if expired {
            if let Some(entry) = inner.cache.pop(key) {
                inner.drop_entry(&entry);
            }
            inner.stats.misses += 1;
            return Ok(None);
        }

        inner.stats.hits += 1;
        let entry = inner.cache.get_mut(key).map(|entry| {
            entry.mark_accessed();
            entry.clone()
        });
        Ok(entry)
    }

    async fn set(&self, key: Fingerprint, entry: CacheEntry) -> GatewayResult<()> {
        let mut inner = self.inner.lock().await;
        let size = entry.size_bytes as u64;

        if let Some((evicted_key, evicted)) = inner.cache.push(key, entry) {
            inner.stats.size_bytes = inner.stats.size_bytes.saturating_sub(evicted.size_bytes as u64);
            // `push` hands back the old value on replacement too; only a
            // different key is a capacity eviction
            if !inner.cache.contains(&evicted_key) {
                inner.stats.evictions += 1;
            }
        }
        inner.stats.size_bytes += size;
        inner.stats.entry_count = inner.cache.len();
        Ok(())
    }

    async fn clear(&self) -> GatewayResult<()> {
        let mut inner = self.inner.lock().await;
        inner.cache.clear();
        inner.stats = CacheStatistics::default();
        Ok(())
    }

    async fn statistics(&self) -> GatewayResult<CacheStatistics> {
        Ok(self.inner.lock().await.stats)
    }

    async fn cleanup_expired(&self) -> GatewayResult<usize> {
        let mut inner = self.inner.lock().await;
        let expired: Vec<Fingerprint> = inner
            .cache
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            if let Some(entry) = inner.cache.pop(key) {
                inner.drop_entry(&entry);
            }
        }
        Ok(expired.len())
    }
}
