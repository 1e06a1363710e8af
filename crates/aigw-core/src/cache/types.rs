//! Cache types and data structures

use crate::types::{ModelId, ProviderId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Response payload kept in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub content: String,
    pub structured_result: Option<serde_json::Value>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub provider_id: ProviderId,
    pub model_id: ModelId,
}

/// Cache entry containing data and metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: CachedResponse,
    pub created_at: DateTime<Utc>,
    expires_at: Instant,
    /// Approximate size of the cached content
    pub size_bytes: usize,
    pub access_count: u64,
    pub last_accessed: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(response: CachedResponse, ttl: Duration) -> Self {
        let now = Utc::now();
        let size_bytes = response.content.len()
            + response
                .structured_result
                .as_ref()
                .map_or(0, |v| v.to_string().len());
        Self {
            response,
            created_at: now,
            expires_at: Instant::now() + ttl,
            size_bytes,
            access_count: 0,
            last_accessed: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn mark_accessed(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatistics {
    pub entry_count: usize,
    pub size_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped for capacity or expiry
    pub evictions: u64,
}

impl CacheStatistics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
