//! Cache Store Module
//!
//! In-process cache engine combining HashMap storage with LRU tracking and
//! TTL expiration. Wrapped by `MemoryCache` to serve the `Cache` trait.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStats, LruTracker, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::{CacheError, CacheResult};

// == Cache Store ==
#[derive(Debug)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store holding at most `max_entries` entries (minimum 1).
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
        }
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    ///
    /// At capacity, the least recently used entry is evicted first.
    pub fn set(&mut self, key: String, value: String, ttl: Duration) -> CacheResult<()> {
        if key.is_empty() || key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidEntry(format!(
                "Key must be 1 to {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidEntry(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.make_room()?;
        }

        self.entries.insert(key.clone(), CacheEntry::new(value, ttl));
        self.lru.touch(&key);
        self.stats.set_total_entries(self.entries.len());
        Ok(())
    }

    // == Get ==
    /// Returns the live value for `key`.
    ///
    /// Expired entries are removed on access and count as misses.
    pub fn get(&mut self, key: &str) -> CacheResult<String> {
        let expired = match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                return Err(CacheError::NotFound(key.to_string()));
            }
            Some(entry) => entry.is_expired(),
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return Err(CacheError::Expired(key.to_string()));
        }

        self.stats.record_hit();
        self.lru.touch(key);
        self.entries
            .get(key)
            .map(|entry| entry.value.clone())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    // == Delete ==
    /// Removes `key`; returns whether an entry was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    // == Increment ==
    /// Atomically replaces the counter at `key` with `current + 1`, where an
    /// absent, expired or non-numeric value counts as `initial`.
    ///
    /// The TTL is reset on every increment. Returns the new value.
    pub fn incr(&mut self, key: &str, initial: u64, ttl: Duration) -> CacheResult<u64> {
        let current = self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(|entry| entry.value.parse::<u64>().ok())
            .unwrap_or(initial);
        let next = current.saturating_add(1);
        self.set(key.to_string(), next.to_string(), ttl)?;
        Ok(next)
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries; returns how many were removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn make_room(&mut self) -> CacheResult<()> {
        // Prefer dropping dead entries over live ones
        if self.cleanup_expired() > 0 {
            return Ok(());
        }
        match self.lru.evict_oldest() {
            Some(evicted) => {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
                Ok(())
            }
            None => Err(CacheError::CacheFull(
                "Cache is full and eviction failed".to_string(),
            )),
        }
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }
}
