//! Aggregated response cache.
//!
//! Unbounded and non-expiring by default. A capacity (with
//! least-recently-used eviction) and a TTL can be switched on through
//! [`RateCacheConfig`].

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use xrates_common::AggregatedResponse;

/// Cached response entry.
#[derive(Debug)]
struct CacheEntry {
    response: AggregatedResponse,
    cached_at: DateTime<Utc>,
    last_used: AtomicU64,
}

impl CacheEntry {
    fn new(response: AggregatedResponse, tick: u64) -> Self {
        Self {
            response,
            cached_at: Utc::now(),
            last_used: AtomicU64::new(tick),
        }
    }

    fn is_valid(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => Utc::now().signed_duration_since(self.cached_at) < ttl,
            None => true,
        }
    }
}

/// Configuration for the rate cache.
#[derive(Debug, Clone, Default)]
pub struct RateCacheConfig {
    /// Maximum number of entries. `None` means unbounded.
    pub max_entries: Option<usize>,
    /// Entry lifetime. `None` means entries never expire.
    pub ttl: Option<Duration>,
}

impl RateCacheConfig {
    /// Unbounded, non-expiring cache.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Bound the cache to `max_entries`.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Expire entries after `ttl`.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Thread-safe cache of aggregated responses, keyed by normalized query key.
///
/// Concurrent misses on the same key are not coalesced: both callers fetch,
/// and the later insert wins.
pub struct RateCache {
    cache: DashMap<String, CacheEntry>,
    config: RateCacheConfig,
    clock: AtomicU64,
    /// Serializes capacity checks so the bound holds under concurrent inserts.
    evict_lock: Mutex<()>,
}

impl RateCache {
    /// Create a new unbounded cache.
    pub fn new() -> Self {
        Self::with_config(RateCacheConfig::default())
    }

    /// Create a new cache with custom configuration.
    pub fn with_config(config: RateCacheConfig) -> Self {
        Self {
            cache: DashMap::new(),
            config,
            clock: AtomicU64::new(0),
            evict_lock: Mutex::new(()),
        }
    }

    /// Get a cached response if present and not expired.
    pub fn get(&self, key: &str) -> Option<AggregatedResponse> {
        if let Some(entry) = self.cache.get(key) {
            if entry.is_valid(self.config.ttl) {
                entry.last_used.store(self.tick(), Ordering::Relaxed);
                debug!(key, "Cache hit");
                return Some(entry.response.clone());
            }

            drop(entry);
            if self.remove_if_expired(key) {
                debug!(key, "Cache entry expired");
            }
        }

        debug!(key, "Cache miss");
        None
    }

    /// Insert a response, replacing any existing entry for the key.
    pub fn insert(&self, key: impl Into<String>, response: AggregatedResponse) {
        let key = key.into();

        if let Some(max_entries) = self.config.max_entries {
            let _guard = self.evict_lock.lock();
            if !self.cache.contains_key(&key) && self.cache.len() >= max_entries {
                self.evict_expired();
                while self.cache.len() >= max_entries {
                    if !self.evict_least_recently_used() {
                        break;
                    }
                }
            }
            self.cache.insert(key, CacheEntry::new(response, self.tick()));
            return;
        }

        self.cache.insert(key, CacheEntry::new(response, self.tick()));
    }

    /// Remove an entry.
    pub fn remove(&self, key: &str) {
        self.cache.remove(key);
    }

    /// Clear all cached responses.
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Get the number of entries in cache.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Evict expired entries. A no-op without a TTL.
    pub fn evict_expired(&self) {
        if let Some(ttl) = self.config.ttl {
            self.cache.retain(|_, entry| entry.is_valid(Some(ttl)));
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let total = self.cache.len();
        let valid = self
            .cache
            .iter()
            .filter(|e| e.is_valid(self.config.ttl))
            .count();

        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total.saturating_sub(valid),
            max_entries: self.config.max_entries,
        }
    }

    /// Remove `key` only if its current entry is expired, so a fresh entry
    /// inserted concurrently survives.
    fn remove_if_expired(&self, key: &str) -> bool {
        let ttl = self.config.ttl;
        self.cache
            .remove_if(key, |_, entry| !entry.is_valid(ttl))
            .is_some()
    }

    fn evict_least_recently_used(&self) -> bool {
        let oldest = self
            .cache
            .iter()
            .min_by_key(|e| e.last_used.load(Ordering::Relaxed))
            .map(|e| e.key().clone());

        match oldest {
            Some(key) => {
                debug!(key = %key, "Evicting least recently used entry");
                self.cache.remove(&key);
                true
            }
            None => false,
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub max_entries: Option<usize>,
}
