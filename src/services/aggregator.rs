//! Per-owner statistics and GeoJSON export
//!
//! Both payloads are cached under fixed keys and dropped by the entry
//! service whenever the owner's entries change.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::read_through;
use crate::auth::Principal;
use crate::cache::keys::{geojson_key, stats_key, GEOJSON_TTL, STATS_TTL};
use crate::cache::Cache;
use crate::error::{ApiError, Result};
use crate::models::{Feature, FeatureCollection, Payload, SpeciesCount, StatsResponse, TreeEntry};
use crate::store::{TreeQuery, TreeStore};

#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn TreeStore>,
    cache: Arc<dyn Cache>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn TreeStore>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    /// Planting statistics of `owner`.
    pub async fn my_stats(&self, owner: &Principal) -> Result<Payload> {
        let owner_id = owner.user_id;
        read_through(
            self.cache.as_ref(),
            &stats_key(owner_id),
            STATS_TTL,
            move || async move {
                let entries = self.store.trees_for_owner(owner_id).await?;
                Ok::<_, ApiError>(summarize(&entries))
            },
        )
        .await
    }

    /// Map export: the viewer's own entries, or every entry for anonymous viewers.
    pub async fn geojson(&self, viewer: Option<&Principal>) -> Result<Payload> {
        let owner_id = viewer.map(|p| p.user_id);
        read_through(
            self.cache.as_ref(),
            &geojson_key(owner_id),
            GEOJSON_TTL,
            move || async move {
                let entries = match owner_id {
                    Some(id) => self.store.trees_for_owner(id).await?,
                    None => self.store.list_trees(&TreeQuery::default()).await?,
                };
                let features = entries.iter().filter_map(Feature::from_entry).collect();
                Ok::<_, ApiError>(FeatureCollection::new(features))
            },
        )
        .await
    }
}

/// Counts entries per species; species appear in name order.
pub fn summarize(entries: &[TreeEntry]) -> StatsResponse {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.fields.species.as_str()).or_default() += 1;
    }

    StatsResponse {
        total_trees: entries.len() as u64,
        species_diversity: counts.len() as u64,
        species_list: counts
            .into_iter()
            .map(|(species, count)| SpeciesCount {
                species: species.to_string(),
                count,
            })
            .collect(),
    }
}
