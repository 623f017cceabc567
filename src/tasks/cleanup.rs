//! Cache Expiry Sweep
//!
//! Background task that periodically removes expired entries from the
//! in-memory cache, including list variants orphaned by a version bump.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The task runs until aborted, sleeping `cleanup_interval_secs` (at least
/// one second) between sweeps. Abort the returned handle during shutdown.
pub fn spawn_cleanup_task(
    cache: Arc<RwLock<CacheStore>>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "cache expiry sweep started");

        loop {
            tokio::time::sleep(interval).await;

            let (removed, remaining) = {
                let mut cache_guard = cache.write().await;
                let removed = cache_guard.cleanup_expired();
                (removed, cache_guard.len())
            };

            if removed > 0 {
                info!(removed, remaining, "cache expiry sweep removed entries");
            } else {
                debug!(remaining, "cache expiry sweep found nothing to remove");
            }
        }
    })
}
