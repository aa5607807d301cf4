//! Bounded in-memory response store.
//!
//! # Responsibilities
//! - Map cache keys to records with a per-store TTL
//! - Keep the total charged size within `max_size`
//! - Evict least-recently-touched records when space is needed
//! - Reject records larger than `max_record_size` outright

use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::cache::record::CacheRecord;
use crate::config::CacheConfig;
use crate::observability::metrics;

/// Error returned when a record cannot be admitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("record of {size} bytes exceeds max record size of {max} bytes")]
    RecordTooLarge { size: usize, max: usize },
}

struct Entry {
    record: Arc<CacheRecord>,
    size: usize,
    expires_at: Instant,
}

struct Inner {
    /// Most recently touched at the front.
    lru: LruCache<String, Entry>,
    remaining: usize,
}

/// Thread-safe, size-bounded cache with TTL expiry and LRU eviction.
pub struct MemoryCache {
    inner: Mutex<Inner>,
    ttl: Duration,
    max_size: usize,
    max_record_size: usize,
}

impl MemoryCache {
    /// Create a cache holding at most `max_size` bytes.
    ///
    /// `max_record_size` is clamped to `max_size` so an admitted record
    /// always fits after eviction.
    pub fn new(ttl: Duration, max_size: usize, max_record_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                lru: LruCache::unbounded(),
                remaining: max_size,
            }),
            ttl,
            max_size,
            max_record_size: max_record_size.min(max_size),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            Duration::from_secs(config.ttl_secs),
            config.max_size,
            config.max_record_size,
        )
    }

    /// Look up a live record, refreshing its recency.
    ///
    /// An expired record is removed and its size refunded.
    pub fn get(&self, key: &str) -> Option<Arc<CacheRecord>> {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let expired = match inner.lru.peek(key) {
            Some(entry) => now > entry.expires_at,
            None => {
                metrics::record_cache_lookup("miss");
                return None;
            }
        };

        if expired {
            if let Some(entry) = inner.lru.pop(key) {
                inner.remaining += entry.size;
            }
            tracing::trace!(key = %key, "Cache entry expired");
            metrics::record_cache_lookup("expired");
            metrics::record_cache_usage(inner.lru.len(), self.max_size - inner.remaining);
            return None;
        }

        metrics::record_cache_lookup("hit");
        inner.lru.get(key).map(|entry| Arc::clone(&entry.record))
    }

    /// Store a record under `key`, replacing any previous record.
    ///
    /// Evicts least-recently-touched records until the new one fits. Fails
    /// only when the record alone exceeds the max record size, in which case
    /// the cache is left unchanged.
    pub fn set(&self, key: impl Into<String>, record: CacheRecord) -> Result<(), CacheError> {
        let size = record.size();
        if size > self.max_record_size {
            metrics::record_cache_store("too_large");
            return Err(CacheError::RecordTooLarge {
                size,
                max: self.max_record_size,
            });
        }

        let key = key.into();
        let expires_at = Instant::now() + self.ttl;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        // Overwrite: drop the old entry first so it is never picked as a victim.
        if let Some(previous) = inner.lru.pop(&key) {
            inner.remaining += previous.size;
        }

        while inner.remaining < size {
            let Some((victim, entry)) = inner.lru.pop_lru() else {
                break;
            };
            inner.remaining += entry.size;
            tracing::trace!(key = %victim, size = entry.size, "Evicted cache entry");
            metrics::record_cache_eviction();
        }

        // size <= max_record_size <= max_size, and an empty cache has max_size free.
        inner.remaining -= size;
        inner.lru.put(
            key,
            Entry {
                record: Arc::new(record),
                size,
                expires_at,
            },
        );

        metrics::record_cache_store("stored");
        metrics::record_cache_usage(inner.lru.len(), self.max_size - inner.remaining);
        Ok(())
    }

    /// Number of stored entries, including expired ones not yet reaped.
    pub fn count(&self) -> usize {
        self.inner.lock().lru.len()
    }

    /// Bytes currently charged against capacity.
    pub fn charged_size(&self) -> usize {
        self.max_size - self.inner.lock().remaining
    }

    /// Bytes still available before eviction kicks in.
    pub fn remaining_capacity(&self) -> usize {
        self.inner.lock().remaining
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("ttl", &self.ttl)
            .field("max_size", &self.max_size)
            .field("max_record_size", &self.max_record_size)
            .field("count", &self.count())
            .finish()
    }
}
