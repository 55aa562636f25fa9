//! In-memory key/value cache with per-entry TTL and LRU eviction.

use crate::config::CacheConfig;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Key selector for [`Cache::delete_by_pattern`].
#[derive(Debug, Clone)]
pub enum KeyPattern {
    /// Shell-style glob, e.g. `session:*`.
    Glob(glob::Pattern),
    Regex(regex::Regex),
}

impl KeyPattern {
    pub fn glob(pattern: &str) -> Result<Self, glob::PatternError> {
        Ok(KeyPattern::Glob(glob::Pattern::new(pattern)?))
    }

    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(KeyPattern::Regex(regex::Regex::new(pattern)?))
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Glob(p) => p.matches(key),
            KeyPattern::Regex(r) => r.is_match(key),
        }
    }
}

/// Counters describing cache behaviour since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
    /// `hits / (hits + misses)`, or `0.0` before any lookup.
    pub hit_rate: f64,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
    access_count: u64,
    last_accessed: Instant,
    created_at: Instant,
    /// Insertion order.
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<V> CacheState<V> {
    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        let removed = before - self.entries.len();
        self.expirations += removed as u64;
        removed
    }

    /// Removes one entry to make room.
    fn evict_one(&mut self, lru: bool) {
        let victim = if lru {
            self.entries
                .iter()
                .min_by_key(|(_, e)| (e.access_count, e.seq))
                .map(|(k, _)| k.clone())
        } else {
            self.entries
                .iter()
                .min_by_key(|(_, e)| e.seq)
                .map(|(k, _)| k.clone())
        };

        if let Some(key) = victim {
            self.entries.remove(&key);
            self.evictions += 1;
            debug!(key = %key, lru, "cache evicted entry");
        }
    }
}

/// Thread-safe cache with string keys.
///
/// Expired entries are dropped lazily on read and by [`Cache::purge_expired`],
/// which [`Cache::spawn_sweeper`] calls periodically. When the cache is full,
/// inserting a new key evicts the entry with the lowest access count (ties go
/// to the oldest insert), or simply the oldest insert when LRU is disabled.
///
/// # Examples
///
/// ```
/// use skillflow::{Cache, CacheConfig};
/// use std::time::Duration;
///
/// let cache = Cache::new(CacheConfig::default());
/// cache.set("analysis:42", "ok".to_string(), Some(Duration::from_secs(60)));
///
/// assert_eq!(cache.get("analysis:42"), Some("ok".to_string()));
/// assert!(cache.get("analysis:43").is_none());
/// assert_eq!(cache.stats().hits, 1);
/// ```
#[derive(Debug)]
pub struct Cache<V> {
    config: CacheConfig,
    state: Mutex<CacheState<V>>,
}

impl<V> Cache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                next_seq: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expiry(&self, ttl: Option<Duration>, now: Instant) -> Option<Instant> {
        ttl.or_else(|| self.config.default_ttl())
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| now + ttl)
    }

    /// Stores `value` under `key`.
    ///
    /// `ttl` falls back to the configured default; a zero TTL never expires.
    /// Overwriting a key keeps its insertion order and access count.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let key = key.into();
        let now = Instant::now();
        let expires_at = self.expiry(ttl, now);
        let mut state = self.lock();

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.value = value;
            entry.expires_at = expires_at;
            entry.last_accessed = now;
            return;
        }

        let max = self.config.max_size;
        if max > 0 && state.entries.len() >= max {
            state.purge_expired(now);
            while state.entries.len() >= max {
                state.evict_one(self.config.lru);
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at,
                access_count: 0,
                last_accessed: now,
                created_at: now,
                seq,
            },
        );
    }

    /// Returns `true` if `key` holds a live entry. Does not count as an access.
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut guard = self.lock();
        let state = &mut *guard;
        match state.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                state.entries.remove(key);
                state.expirations += 1;
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    /// Deletes every key matching `pattern` and returns how many were removed.
    pub fn delete_by_pattern(&self, pattern: &KeyPattern) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| !pattern.matches(key));
        before - state.entries.len()
    }

    /// Drops all expired entries now.
    pub fn purge_expired(&self) -> usize {
        self.lock().purge_expired(Instant::now())
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Age of the entry under `key`, if present.
    pub fn age(&self, key: &str) -> Option<Duration> {
        self.lock().entries.get(key).map(|e| e.created_at.elapsed())
    }

    /// Time since the entry under `key` was last read or written.
    pub fn idle_time(&self, key: &str) -> Option<Duration> {
        self.lock()
            .entries
            .get(key)
            .map(|e| e.last_accessed.elapsed())
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let lookups = state.hits + state.misses;
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            expirations: state.expirations,
            size: state.entries.len(),
            hit_rate: if lookups == 0 {
                0.0
            } else {
                state.hits as f64 / lookups as f64
            },
        }
    }
}

impl<V: Clone> Cache<V> {
    /// Returns a clone of the value under `key`.
    ///
    /// An expired entry is removed and counted as both a miss and an expiration.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut guard = self.lock();
        let state = &mut *guard;

        let expired = match state.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.access_count += 1;
                entry.last_accessed = now;
                let value = entry.value.clone();
                state.hits += 1;
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.entries.remove(key);
            state.expirations += 1;
        }
        state.misses += 1;
        None
    }

    /// Returns the cached value or stores and returns `factory()`.
    pub fn get_or_set<F>(&self, key: &str, factory: F, ttl: Option<Duration>) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = factory();
        self.set(key, value.clone(), ttl);
        value
    }

    /// Async variant of [`Cache::get_or_set`].
    ///
    /// The lock is not held while `factory` runs, so concurrent callers may
    /// both compute the value; the last write wins.
    pub async fn get_or_set_async<F, Fut>(&self, key: &str, factory: F, ttl: Option<Duration>) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = factory().await;
        self.set(key, value.clone(), ttl);
        value
    }
}

impl<V: Send + 'static> Cache<V> {
    /// Starts the periodic expiry sweep on the current tokio runtime.
    ///
    /// The task holds only a weak reference and exits once the cache is dropped.
    pub fn spawn_sweeper(cache: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(cache);
        let period = cache.config.sweep_interval().max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                let removed = cache.purge_expired();
                if removed > 0 {
                    debug!(removed, "cache sweep removed expired entries");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_size: usize, lru: bool) -> CacheConfig {
        CacheConfig {
            max_size,
            lru,
            ..CacheConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_counts_miss_and_expiration() {
        let cache = Cache::new(CacheConfig::default());
        cache.set("k", 1, Some(Duration::from_millis(100)));
        assert_eq!(cache.get("k"), Some(1));

        tokio::time::advance(Duration::from_millis(150)).await;

        assert_eq!(cache.get("k"), None);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.size, 0);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_never_expires() {
        let cache = Cache::new(CacheConfig {
            default_ttl_ms: Some(10),
            ..CacheConfig::default()
        });
        cache.set("forever", "v", Some(Duration::ZERO));
        cache.set("default", "v", None);

        tokio::time::advance(Duration::from_secs(3600)).await;

        assert!(cache.has("forever"));
        assert!(!cache.has("default"));
    }

    #[test]
    fn test_lru_evicts_least_accessed() {
        let cache = Cache::new(config(3, true));
        cache.set("a", 1, None);
        cache.set("b", 2, None);
        cache.set("c", 3, None);
        cache.get("a");
        cache.get("c");

        cache.set("d", 4, None);

        assert!(cache.has("a"));
        assert!(!cache.has("b"));
        assert!(cache.has("c"));
        assert!(cache.has("d"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_lru_ties_break_by_insertion_order() {
        let cache = Cache::new(config(2, true));
        cache.set("first", 1, None);
        cache.set("second", 2, None);
        cache.set("third", 3, None);

        assert!(!cache.has("first"));
        assert!(cache.has("second"));
    }

    #[test]
    fn test_fifo_when_lru_disabled() {
        let cache = Cache::new(config(2, false));
        cache.set("a", 1, None);
        cache.set("b", 2, None);
        for _ in 0..5 {
            cache.get("a");
        }
        cache.set("c", 3, None);

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = Cache::new(config(2, true));
        cache.set("a", 1, None);
        cache.set("b", 2, None);
        cache.set("a", 10, None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_delete_by_pattern() {
        let cache = Cache::new(CacheConfig::default());
        cache.set("session:1", 1, None);
        cache.set("session:2", 2, None);
        cache.set("skill:lint", 3, None);

        let glob = KeyPattern::glob("session:*").unwrap();
        assert_eq!(cache.delete_by_pattern(&glob), 2);
        assert_eq!(cache.len(), 1);

        let re = KeyPattern::regex(r"^skill:\w+$").unwrap();
        assert_eq!(cache.delete_by_pattern(&re), 1);
        assert!(cache.is_empty());

        assert!(KeyPattern::regex("(").is_err());
    }

    #[test]
    fn test_get_or_set_calls_factory_once() {
        let cache = Cache::new(CacheConfig::default());
        let mut calls = 0;
        let first = cache.get_or_set("k", || {
            calls += 1;
            "computed".to_string()
        }, None);
        let second = cache.get_or_set("k", || "other".to_string(), None);

        assert_eq!(first, "computed");
        assert_eq!(second, "computed");
        assert_eq!(calls, 1);
        assert!(cache.delete("k"));
        assert!(!cache.delete("k"));
    }

    #[tokio::test]
    async fn test_get_or_set_async() {
        let cache = Cache::new(CacheConfig::default());
        let value = cache
            .get_or_set_async("report", || async { vec![1, 2, 3] }, None)
            .await;
        assert_eq!(value, vec![1, 2, 3]);

        let cached = cache
            .get_or_set_async("report", || async { Vec::new() }, None)
            .await;
        assert_eq!(cached, vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_expired_entries() {
        let cache = Arc::new(Cache::new(CacheConfig {
            sweep_interval_ms: 100,
            ..CacheConfig::default()
        }));
        cache.set("short", 1, Some(Duration::from_millis(50)));
        cache.set("long", 2, None);

        let handle = Cache::spawn_sweeper(&cache);
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().expirations, 1);

        drop(cache);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.is_finished());
    }
}
