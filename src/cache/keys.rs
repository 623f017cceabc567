//! Cache key layout and lifetimes
//!
//! The key namespace is flat:
//! - `tree_list_cache_version` - list version counter (24 h)
//! - `tree_list_v{version}_{hash}` - list payload per parameter set (600 s)
//! - `user_stats_{owner_id}` - statistics payload (120 s)
//! - `geojson_all_trees_{owner_id|anon}` - GeoJSON payload (600 s)

use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::store::TreeQuery;

pub const LIST_VERSION_KEY: &str = "tree_list_cache_version";
pub const LIST_VERSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const LIST_TTL: Duration = Duration::from_secs(600);
pub const STATS_TTL: Duration = Duration::from_secs(120);
pub const GEOJSON_TTL: Duration = Duration::from_secs(600);

const GEOJSON_ANON: &str = "anon";

/// Key of one list variant: the version it was computed under plus a
/// digest of the normalized parameters.
pub fn list_key(version: u64, query: &TreeQuery) -> String {
    let digest = Sha256::digest(query.canonical().as_bytes());
    format!("tree_list_v{}_{}", version, hex::encode(digest))
}

pub fn stats_key(owner_id: u64) -> String {
    format!("user_stats_{}", owner_id)
}

/// Owner-scoped key for authenticated viewers, a shared key otherwise.
pub fn geojson_key(owner_id: Option<u64>) -> String {
    match owner_id {
        Some(id) => format!("geojson_all_trees_{}", id),
        None => format!("geojson_all_trees_{}", GEOJSON_ANON),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TreeOrdering;

    #[test]
    fn test_fixed_keys() {
        assert_eq!(stats_key(42), "user_stats_42");
        assert_eq!(geojson_key(Some(7)), "geojson_all_trees_7");
        assert_eq!(geojson_key(None), "geojson_all_trees_anon");
    }

    #[test]
    fn test_list_key_embeds_version() {
        let query = TreeQuery::default();
        let v1 = list_key(1, &query);
        let v2 = list_key(2, &query);

        assert!(v1.starts_with("tree_list_v1_"));
        assert!(v2.starts_with("tree_list_v2_"));
        assert_eq!(v1["tree_list_v1_".len()..], v2["tree_list_v2_".len()..]);
    }

    #[test]
    fn test_list_key_varies_with_params() {
        let by_date = TreeQuery::default();
        let by_species = TreeQuery {
            ordering: TreeOrdering::SpeciesAsc,
            ..TreeQuery::default()
        };
        assert_ne!(list_key(1, &by_date), list_key(1, &by_species));
    }

    #[test]
    fn test_list_key_fits_store_limit() {
        let query = TreeQuery {
            search: Some("x".repeat(1000)),
            ..TreeQuery::default()
        };
        assert!(list_key(u64::MAX, &query).len() <= crate::cache::MAX_KEY_LENGTH);
    }
}
