//! Services Module
//!
//! Business operations behind the HTTP handlers. Services own the
//! read-through caching and the invalidation sequence; handlers only check
//! capabilities and translate wire types.

mod accounts;
mod aggregator;
mod entries;
mod photos;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::cache::Cache;
use crate::error::{ApiError, Result};
use crate::models::Payload;

pub use accounts::AccountService;
pub use aggregator::{summarize, Aggregator};
pub use entries::{EntryService, NOT_OWNER};
pub use photos::{PhotoStore, EMPTY_PHOTO, NOT_AN_IMAGE, PHOTO_DIR};

/// Serves `key` from the cache, or computes, stores and returns the payload.
///
/// A miss always reaches `compute`; nothing is cached when it fails.
pub(crate) async fn read_through<T, F, Fut>(
    cache: &dyn Cache,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<Payload>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let Some(body) = cache.get(key).await {
        debug!(key, "cache hit");
        return Ok(Payload::hit(body));
    }

    let value = compute().await?;
    let body = serde_json::to_string(&value)
        .map_err(|e| ApiError::Internal(format!("Failed to encode response: {}", e)))?;
    cache.set(key, body.clone(), ttl).await;
    Ok(Payload::miss(body))
}
