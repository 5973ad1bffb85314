//! Outcome cache layered around a lookup client.
//!
//! Remembers found entries and, optionally, "no such entry" results so repeated
//! lookups of the same key skip the fetch. Errors are never cached. The corpus is
//! immutable per deployment, so the TTL only bounds memory held for stale keys.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::client::{LookupClient, LookupOutcome};
use crate::config::CacheConfig;
use crate::error::Result;

/// Configuration for the lookup cache.
#[derive(Clone, Debug)]
pub struct LookupCacheConfig {
    /// How long a cached outcome stays valid.
    pub ttl: Duration,
    /// Maximum number of cached outcomes.
    pub max_entries: usize,
    /// Whether the cache is consulted at all.
    pub enabled: bool,
    /// Whether NotFound outcomes are cached.
    pub cache_not_found: bool,
}

impl Default for LookupCacheConfig {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for LookupCacheConfig {
    fn from(config: &CacheConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries,
            enabled: config.enabled,
            cache_not_found: config.cache_not_found,
        }
    }
}

#[derive(Clone, Debug)]
struct CachedOutcome {
    outcome: LookupOutcome,
    recorded_at: Instant,
}

impl CachedOutcome {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.recorded_at.elapsed() > ttl
    }
}

/// Lookup cache statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LookupCacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that went to the client.
    pub misses: u64,
    /// Outcomes inserted.
    pub inserts: u64,
    /// Entries dropped because their TTL passed.
    pub expirations: u64,
    /// Entries dropped to stay under capacity.
    pub evictions: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
}

/// A lookup client with an outcome cache in front of it.
pub struct CachedLookup {
    client: LookupClient,
    config: LookupCacheConfig,
    entries: DashMap<String, CachedOutcome>,
    counters: Counters,
}

impl CachedLookup {
    /// Wraps `client` with a cache.
    pub fn new(client: LookupClient, config: LookupCacheConfig) -> Self {
        Self {
            client,
            config,
            entries: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Returns the wrapped client.
    pub fn client(&self) -> &LookupClient {
        &self.client
    }

    /// Looks up `key`, answering from the cache when possible.
    pub async fn lookup(&self, key: &str) -> Result<LookupOutcome> {
        if !self.config.enabled {
            return self.client.lookup(key).await;
        }

        let cached = self
            .entries
            .get(key)
            .map(|e| (e.outcome.clone(), e.is_expired(self.config.ttl)));
        match cached {
            Some((outcome, false)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(outcome);
            }
            Some((_, true)) => {
                self.entries.remove(key);
                self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            }
            None => {}
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let outcome = self.client.lookup(key).await?;
        if self.config.cache_not_found || !outcome.is_not_found() {
            self.insert(key, outcome.clone());
        }
        Ok(outcome)
    }

    fn insert(&self, key: &str, outcome: LookupOutcome) {
        if self.entries.len() >= self.config.max_entries {
            self.evict_expired();
            if self.entries.len() >= self.config.max_entries {
                self.evict_oldest();
            }
        }

        self.entries.insert(
            key.to_string(),
            CachedOutcome {
                outcome,
                recorded_at: Instant::now(),
            },
        );
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
    }

    fn evict_expired(&self) {
        let ttl = self.config.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(ttl));
        let removed = before.saturating_sub(self.entries.len());
        self.counters
            .expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().recorded_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drops the cached outcome for `key`.
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drops every cached outcome.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached outcomes, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> LookupCacheStats {
        LookupCacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }
}
