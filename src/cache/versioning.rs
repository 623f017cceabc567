//! List cache version counter
//!
//! Every list cache key embeds the version current at read time, so bumping
//! the counter makes all cached list variants unreachable at once. The dead
//! keys are left to expire or be evicted.

use std::sync::Arc;

use tracing::debug;

use crate::cache::keys::{LIST_VERSION_KEY, LIST_VERSION_TTL};
use crate::cache::Cache;

/// Version assumed while the counter is absent from the cache.
pub const INITIAL_VERSION: u64 = 1;

#[derive(Clone)]
pub struct ListVersion {
    cache: Arc<dyn Cache>,
}

impl ListVersion {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Current version; absent or unreadable counters read as 1.
    pub async fn current_version(&self) -> u64 {
        self.cache
            .get(LIST_VERSION_KEY)
            .await
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(INITIAL_VERSION)
    }

    /// Bumps the version and returns the new value.
    ///
    /// Uses the cache's atomic increment so concurrent bumps within one cache
    /// are never lost. When the backend cannot count, `current + 1` is
    /// returned without being stored; such a backend caches nothing either.
    pub async fn invalidate_all(&self) -> u64 {
        let version = match self
            .cache
            .incr(LIST_VERSION_KEY, INITIAL_VERSION, LIST_VERSION_TTL)
            .await
        {
            Some(version) => version,
            None => self.current_version().await + 1,
        };
        debug!(version, "tree list cache invalidated");
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, NoopCache};

    #[tokio::test]
    async fn test_absent_counter_is_one() {
        let versions = ListVersion::new(Arc::new(MemoryCache::new(10)));
        assert_eq!(versions.current_version().await, 1);
    }

    #[tokio::test]
    async fn test_invalidate_increments() {
        let versions = ListVersion::new(Arc::new(MemoryCache::new(10)));
        assert_eq!(versions.invalidate_all().await, 2);
        assert_eq!(versions.invalidate_all().await, 3);
        assert_eq!(versions.current_version().await, 3);
    }

    #[tokio::test]
    async fn test_garbage_counter_reads_as_initial() {
        let cache = Arc::new(MemoryCache::new(10));
        cache
            .set(LIST_VERSION_KEY, "garbage".to_string(), LIST_VERSION_TTL)
            .await;
        let versions = ListVersion::new(cache);
        assert_eq!(versions.current_version().await, 1);
        assert_eq!(versions.invalidate_all().await, 2);
    }

    #[tokio::test]
    async fn test_noop_backend_never_fails() {
        let versions = ListVersion::new(Arc::new(NoopCache));
        assert_eq!(versions.current_version().await, 1);
        assert_eq!(versions.invalidate_all().await, 2);
        assert_eq!(versions.current_version().await, 1);
    }
}
