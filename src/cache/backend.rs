//! Best-effort cache seam
//!
//! Services talk to the cache through [`Cache`]. No method reports an
//! error: a failing backend reads as a miss and writes become no-ops, so the
//! durable store stays the only source of truth.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStore};

#[async_trait]
pub trait Cache: Send + Sync {
    /// Live value for `key`, `None` on absence, expiry or backend failure.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` for `ttl`; failures are swallowed.
    async fn set(&self, key: &str, value: String, ttl: Duration);

    /// Removes `key` if present; failures are swallowed.
    async fn delete(&self, key: &str);

    /// Atomically stores `current + 1` (absent counts as `initial`) with a
    /// fresh `ttl` and returns the new value, or `None` when the backend
    /// cannot count.
    async fn incr(&self, key: &str, initial: u64, ttl: Duration) -> Option<u64>;

    /// Counters for the health endpoint, when the backend keeps any.
    async fn stats(&self) -> Option<CacheStats> {
        None
    }

    fn backend_name(&self) -> &'static str;
}

// == Memory Cache ==
/// Process-local cache over a shared [`CacheStore`].
#[derive(Debug, Clone)]
pub struct MemoryCache {
    store: Arc<RwLock<CacheStore>>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(CacheStore::new(max_entries))),
        }
    }

    /// Handle on the underlying store, shared with the expiry sweep.
    pub fn shared_store(&self) -> Arc<RwLock<CacheStore>> {
        Arc::clone(&self.store)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        // Write lock: a lookup updates recency and counters
        let mut store = self.store.write().await;
        match store.get(key) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(key, reason = %err, "cache miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let mut store = self.store.write().await;
        if let Err(err) = store.set(key.to_string(), value, ttl) {
            warn!(key, error = %err, "cache write dropped");
        }
    }

    async fn delete(&self, key: &str) {
        let mut store = self.store.write().await;
        store.delete(key);
    }

    async fn incr(&self, key: &str, initial: u64, ttl: Duration) -> Option<u64> {
        let mut store = self.store.write().await;
        match store.incr(key, initial, ttl) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "cache increment dropped");
                None
            }
        }
    }

    async fn stats(&self) -> Option<CacheStats> {
        Some(self.store.read().await.stats())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// == Noop Cache ==
/// Cache that stores nothing; every read recomputes from the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl Cache for NoopCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) {}

    async fn delete(&self, _key: &str) {}

    async fn incr(&self, _key: &str, _initial: u64, _ttl: Duration) -> Option<u64> {
        None
    }

    fn backend_name(&self) -> &'static str {
        "none"
    }
}
