//! Response caching
//!
//! The cache is never authoritative: a miss, a storage failure or a flushed
//! cache only costs an extra provider call.

mod fingerprint;
mod storage;
mod types;

pub use fingerprint::{Fingerprint, FingerprintInput};
pub use storage::{CacheStorage, MemoryStorage};
pub use types::{CacheEntry, CacheStatistics, CachedResponse};

use crate::config::CacheConfig;
use crate::error::GatewayResult;
use std::sync::Arc;
use std::time::Duration;

/// TTL-bound cache of provider responses keyed by request fingerprint
pub struct ResponseCache {
    storage: Arc<dyn CacheStorage>,
    enabled: bool,
    ttl: Duration,
    temperature_precision: usize,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("enabled", &self.enabled)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ResponseCache {
    /// In-memory LRU cache sized from configuration
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new(config.capacity)), config)
    }

    pub fn with_storage(storage: Arc<dyn CacheStorage>, config: &CacheConfig) -> Self {
        Self {
            storage,
            enabled: config.enabled,
            ttl: config.ttl,
            temperature_precision: config.temperature_precision,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn fingerprint(&self, input: &FingerprintInput<'_>) -> Fingerprint {
        Fingerprint::compute(input, self.temperature_precision)
    }

    /// Cached response for `fingerprint`; storage errors read as a miss
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<CachedResponse> {
        if !self.enabled {
            return None;
        }
        match self.storage.get(fingerprint).await {
            Ok(Some(entry)) => {
                tracing::debug!(fingerprint = %fingerprint, hits = entry.access_count, "cache hit");
                Some(entry.response)
            }
            Ok(None) => {
                tracing::debug!(fingerprint = %fingerprint, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store a response under the configured TTL; failures are logged only
    pub async fn put(&self, fingerprint: Fingerprint, response: CachedResponse) {
        self.put_with_ttl(fingerprint, response, self.ttl).await
    }

    pub async fn put_with_ttl(&self, fingerprint: Fingerprint, response: CachedResponse, ttl: Duration) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.storage.set(fingerprint, CacheEntry::new(response, ttl)).await {
            tracing::warn!(error = %e, "cache write failed");
        }
    }

    /// Remove every entry
    pub async fn flush_all(&self) -> GatewayResult<()> {
        self.storage.clear().await?;
        tracing::info!("response cache flushed");
        Ok(())
    }

    pub async fn cleanup_expired(&self) -> GatewayResult<usize> {
        self.storage.cleanup_expired().await
    }

    pub async fn statistics(&self) -> GatewayResult<CacheStatistics> {
        self.storage.statistics().await
    }
}
