//! Cache Module
//!
//! Read-through caching for list, statistics and GeoJSON payloads, with
//! version-counter invalidation for the parameterized tree list.

mod backend;
mod entry;
pub mod keys;
mod lru;
mod stats;
mod store;
mod versioning;


// Re-export public types
pub use backend::{Cache, MemoryCache, NoopCache};
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;
pub use versioning::{ListVersion, INITIAL_VERSION};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 4 * 1024 * 1024; // 4 MB
