//! Tree entry service
//!
//! CRUD over tree entries plus the cached public list. Every successful
//! write runs the same invalidation sequence for the entry's owner.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::read_through;
use crate::auth::Principal;
use crate::cache::keys::{geojson_key, list_key, stats_key, LIST_TTL};
use crate::cache::{Cache, ListVersion};
use crate::error::{ApiError, FieldErrors, Result, NON_FIELD_ERRORS};
use crate::models::{Payload, TreeEntry, TreeEntryRequest, TreeEntryView, WriteMode};
use crate::store::{TreeQuery, TreeStore, DUPLICATE_TREE};

/// Message returned when a caller modifies someone else's entry.
pub const NOT_OWNER: &str = "You do not have permission to perform this action.";

#[derive(Clone)]
pub struct EntryService {
    store: Arc<dyn TreeStore>,
    cache: Arc<dyn Cache>,
    versions: ListVersion,
}

impl EntryService {
    pub fn new(store: Arc<dyn TreeStore>, cache: Arc<dyn Cache>) -> Self {
        Self {
            store,
            versions: ListVersion::new(Arc::clone(&cache)),
            cache,
        }
    }

    /// Validates and persists a new entry owned by `owner`.
    pub async fn create(&self, owner: &Principal, req: &TreeEntryRequest) -> Result<TreeEntry> {
        let fields = req
            .validate(None, WriteMode::Create)
            .map_err(ApiError::Validation)?;
        if self
            .store
            .duplicate_exists(owner.user_id, &fields, None)
            .await?
        {
            return Err(duplicate_planting());
        }

        let entry = self.store.insert_tree(owner.user_id, fields).await?;
        info!(tree_id = entry.id, owner_id = entry.owner_id, "tree entry created");
        self.invalidate_for_owner(entry.owner_id).await;
        Ok(entry)
    }

    pub async fn retrieve(&self, id: u64) -> Result<TreeEntry> {
        Ok(self.store.get_tree(id).await?)
    }

    /// Applies `req` to entry `id` as a full (PUT) or partial (PATCH) update.
    pub async fn update(
        &self,
        requester: &Principal,
        id: u64,
        req: &TreeEntryRequest,
        mode: WriteMode,
    ) -> Result<TreeEntry> {
        let current = self.owned_entry(requester, id).await?;
        let fields = req
            .validate(Some(&current.fields), mode)
            .map_err(ApiError::Validation)?;
        if self
            .store
            .duplicate_exists(current.owner_id, &fields, Some(id))
            .await?
        {
            return Err(duplicate_planting());
        }

        let entry = self.store.update_tree(id, fields).await?;
        info!(tree_id = entry.id, owner_id = entry.owner_id, ?mode, "tree entry updated");
        self.invalidate_for_owner(entry.owner_id).await;
        Ok(entry)
    }

    pub async fn delete(&self, requester: &Principal, id: u64) -> Result<()> {
        self.owned_entry(requester, id).await?;
        let removed = self.store.delete_tree(id).await?;
        info!(tree_id = removed.id, owner_id = removed.owner_id, "tree entry deleted");
        self.invalidate_for_owner(removed.owner_id).await;
        Ok(())
    }

    /// Public list, cached per version and normalized parameter set.
    pub async fn list(&self, params: &HashMap<String, String>) -> Result<Payload> {
        let query = TreeQuery::from_params(params).map_err(ApiError::Validation)?;
        let version = self.versions.current_version().await;
        let key = list_key(version, &query);

        read_through(self.cache.as_ref(), &key, LIST_TTL, move || async move {
            let entries = self.store.list_trees(&query).await?;
            Ok::<_, ApiError>(entries.iter().map(TreeEntryView::from).collect::<Vec<_>>())
        })
        .await
    }

    /// Drops every cached payload a change to `owner_id`'s entries can affect.
    ///
    /// The list is invalidated wholesale through the version counter; the
    /// owner's stats and both GeoJSON variants are deleted directly.
    pub async fn invalidate_for_owner(&self, owner_id: u64) {
        let version = self.versions.invalidate_all().await;
        self.cache.delete(&stats_key(owner_id)).await;
        self.cache.delete(&geojson_key(Some(owner_id))).await;
        self.cache.delete(&geojson_key(None)).await;
        info!(owner_id, list_version = version, "tree caches invalidated");
    }

    async fn owned_entry(&self, requester: &Principal, id: u64) -> Result<TreeEntry> {
        let entry = self.store.get_tree(id).await?;
        if !entry.is_owned_by(requester.user_id) {
            warn!(tree_id = id, user_id = requester.user_id, "write to foreign tree entry refused");
            return Err(ApiError::Forbidden(NOT_OWNER.to_string()));
        }
        Ok(entry)
    }
}

fn duplicate_planting() -> ApiError {
    ApiError::Validation(FieldErrors::single(NON_FIELD_ERRORS, DUPLICATE_TREE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::{GEOJSON_TTL, STATS_TTL};
    use crate::cache::{MemoryCache, INITIAL_VERSION};
    use crate::models::NewUser;
    use crate::store::{InMemoryStore, UserStore};

    struct Fixture {
        store: Arc<InMemoryStore>,
        cache: Arc<MemoryCache>,
        service: EntryService,
        alice: Principal,
        bob: Principal,
    }

    async fn register(store: &InMemoryStore, name: &str) -> Principal {
        let user = store
            .insert_user(NewUser {
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                username: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap();
        Principal {
            user_id: user.id,
            username: user.username,
        }
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(MemoryCache::new(100));
        let service = EntryService::new(store.clone(), cache.clone());
        let alice = register(&store, "alice").await;
        let bob = register(&store, "bob").await;
        Fixture {
            store,
            cache,
            service,
            alice,
            bob,
        }
    }

    fn planting(species: &str, lat: f64, lon: f64) -> TreeEntryRequest {
        TreeEntryRequest {
            species: Some(species.to_string()),
            latitude: Some(lat.into()),
            longitude: Some(lon.into()),
            date_planted: Some("2025-06-28".to_string()),
            photo: None,
        }
    }

    fn no_params() -> HashMap<String, String> {
        HashMap::new()
    }

    #[tokio::test]
    async fn test_create_persists_and_bumps_version() {
        let f = fixture().await;
        let entry = f.service.create(&f.alice, &planting("Oak", 10.0, 20.0)).await.unwrap();

        assert_eq!(entry.owner_username, "alice");
        assert_eq!(f.service.versions.current_version().await, INITIAL_VERSION + 1);
    }

    #[tokio::test]
    async fn test_create_invalidates_owner_aggregates() {
        let f = fixture().await;
        let alice_stats = stats_key(f.alice.user_id);
        let alice_geo = geojson_key(Some(f.alice.user_id));
        let bob_stats = stats_key(f.bob.user_id);
        for key in [&alice_stats, &alice_geo, &bob_stats] {
            f.cache.set(key, "{}".to_string(), STATS_TTL).await;
        }
        f.cache.set(&geojson_key(None), "{}".to_string(), GEOJSON_TTL).await;

        f.service.create(&f.alice, &planting("Oak", 10.0, 20.0)).await.unwrap();

        assert!(f.cache.get(&alice_stats).await.is_none());
        assert!(f.cache.get(&alice_geo).await.is_none());
        assert!(f.cache.get(&geojson_key(None)).await.is_none());
        assert!(f.cache.get(&bob_stats).await.is_some());
    }

    #[tokio::test]
    async fn test_invalid_create_touches_nothing() {
        let f = fixture().await;
        let err = f
            .service
            .create(&f.alice, &planting("Oak", 91.0, 20.0))
            .await
            .unwrap_err();

        match err {
            ApiError::Validation(errors) => assert!(errors.contains("latitude")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(f.store.query_count(), 0);
        assert_eq!(f.service.versions.current_version().await, INITIAL_VERSION);
    }

    #[tokio::test]
    async fn test_duplicate_planting_rejected() {
        let f = fixture().await;
        f.service.create(&f.alice, &planting("Oak", 10.0, 20.0)).await.unwrap();

        let err = f
            .service
            .create(&f.alice, &planting("Oak", 10.0, 20.0))
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.messages(NON_FIELD_ERRORS), [DUPLICATE_TREE.to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Any differing component is a new planting; another owner may repeat it
        f.service.create(&f.alice, &planting("Maple", 10.0, 20.0)).await.unwrap();
        f.service.create(&f.alice, &planting("Oak", 10.5, 20.0)).await.unwrap();
        f.service.create(&f.bob, &planting("Oak", 10.0, 20.0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_served_from_cache() {
        let f = fixture().await;
        f.service.create(&f.alice, &planting("Oak", 10.0, 20.0)).await.unwrap();
        let before = f.store.query_count();

        let first = f.service.list(&no_params()).await.unwrap();
        let second = f.service.list(&no_params()).await.unwrap();

        assert!(!first.is_hit());
        assert!(second.is_hit());
        assert_eq!(first.body, second.body);
        assert_eq!(f.store.query_count(), before + 1);
    }

    #[tokio::test]
    async fn test_list_reflects_create() {
        let f = fixture().await;
        let empty = f.service.list(&no_params()).await.unwrap();
        assert_eq!(empty.json().unwrap(), serde_json::json!([]));

        let entry = f.service.create(&f.bob, &planting("Birch", 1.0, 2.0)).await.unwrap();

        let listed = f.service.list(&no_params()).await.unwrap();
        assert!(!listed.is_hit());
        let json = listed.json().unwrap();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["id"], entry.id);
        assert_eq!(json[0]["user"], "bob");
    }

    #[tokio::test]
    async fn test_list_filters_share_nothing() {
        let f = fixture().await;
        f.service.create(&f.alice, &planting("Oak", 1.0, 2.0)).await.unwrap();
        f.service.create(&f.bob, &planting("Maple", 3.0, 4.0)).await.unwrap();

        let params: HashMap<String, String> =
            [("species".to_string(), "Maple".to_string())].into_iter().collect();
        let maples = f.service.list(&params).await.unwrap();
        let all = f.service.list(&no_params()).await.unwrap();

        assert_eq!(maples.json().unwrap().as_array().unwrap().len(), 1);
        assert_eq!(all.json().unwrap().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_rejects_bad_date_filter() {
        let f = fixture().await;
        let params: HashMap<String, String> =
            [("date_planted".to_string(), "yesterday".to_string())].into_iter().collect();
        assert!(matches!(
            f.service.list(&params).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_by_stranger_is_forbidden() {
        let f = fixture().await;
        let entry = f.service.create(&f.alice, &planting("Oak", 10.0, 20.0)).await.unwrap();
        let version = f.service.versions.current_version().await;

        let err = f
            .service
            .update(&f.bob, entry.id, &planting("Elm", 1.0, 1.0), WriteMode::Replace)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Forbidden(_)));
        assert_eq!(f.service.versions.current_version().await, version);
        assert_eq!(f.service.retrieve(entry.id).await.unwrap().fields.species, "Oak");
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let f = fixture().await;
        let err = f
            .service
            .update(&f.alice, 999, &planting("Elm", 1.0, 1.0), WriteMode::Replace)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_patch_keeps_other_fields() {
        let f = fixture().await;
        let entry = f.service.create(&f.alice, &planting("Oak", 10.0, 20.0)).await.unwrap();
        let patch = TreeEntryRequest {
            species: Some("Willow".to_string()),
            ..Default::default()
        };

        let updated = f
            .service
            .update(&f.alice, entry.id, &patch, WriteMode::Patch)
            .await
            .unwrap();

        assert_eq!(updated.fields.species, "Willow");
        assert_eq!(updated.fields.latitude, 10.0);
        assert_eq!(updated.created_at, entry.created_at);
        assert_eq!(f.service.versions.current_version().await, INITIAL_VERSION + 2);
    }

    #[tokio::test]
    async fn test_update_to_own_values_is_not_a_duplicate() {
        let f = fixture().await;
        let entry = f.service.create(&f.alice, &planting("Oak", 10.0, 20.0)).await.unwrap();
        f.service
            .update(&f.alice, entry.id, &planting("Oak", 10.0, 20.0), WriteMode::Replace)
            .await
            .unwrap();
    }

    async fn seed_owner_aggregates(f: &Fixture) {
        f.cache
            .set(&stats_key(f.alice.user_id), "{}".to_string(), STATS_TTL)
            .await;
        f.cache
            .set(&geojson_key(Some(f.alice.user_id)), "{}".to_string(), GEOJSON_TTL)
            .await;
        f.cache.set(&geojson_key(None), "{}".to_string(), GEOJSON_TTL).await;
    }

    async fn assert_owner_aggregates_dropped(f: &Fixture) {
        assert!(f.cache.get(&stats_key(f.alice.user_id)).await.is_none());
        assert!(f.cache.get(&geojson_key(Some(f.alice.user_id))).await.is_none());
        assert!(f.cache.get(&geojson_key(None)).await.is_none());
    }

    #[tokio::test]
    async fn test_patch_and_delete_invalidate_entry_owner() {
        let f = fixture().await;
        let entry = f.service.create(&f.alice, &planting("Oak", 10.0, 20.0)).await.unwrap();
        let species: HashMap<String, String> =
            [("species".to_string(), "Oak".to_string())].into_iter().collect();

        // PATCH
        seed_owner_aggregates(&f).await;
        f.service.list(&no_params()).await.unwrap();
        f.service.list(&species).await.unwrap();
        assert!(f.service.list(&species).await.unwrap().is_hit());

        let patch = TreeEntryRequest {
            species: Some("Willow".to_string()),
            ..Default::default()
        };
        f.service
            .update(&f.alice, entry.id, &patch, WriteMode::Patch)
            .await
            .unwrap();

        assert_owner_aggregates_dropped(&f).await;
        let oaks = f.service.list(&species).await.unwrap();
        assert!(!oaks.is_hit());
        assert_eq!(oaks.json().unwrap(), serde_json::json!([]));

        // DELETE by a stranger changes nothing
        seed_owner_aggregates(&f).await;
        let listed = f.service.list(&no_params()).await.unwrap();
        assert!(!listed.is_hit());
        assert!(f.service.list(&no_params()).await.unwrap().is_hit());

        assert!(matches!(
            f.service.delete(&f.bob, entry.id).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(f.cache.get(&stats_key(f.alice.user_id)).await.is_some());
        assert!(f.cache.get(&geojson_key(None)).await.is_some());
        assert!(f.service.list(&no_params()).await.unwrap().is_hit());

        // DELETE by the owner
        let before = f.store.query_count();
        f.service.delete(&f.alice, entry.id).await.unwrap();
        assert_owner_aggregates_dropped(&f).await;

        let after_delete = f.service.list(&no_params()).await.unwrap();
        assert!(!after_delete.is_hit());
        assert_eq!(after_delete.json().unwrap(), serde_json::json!([]));
        assert!(f.store.query_count() > before);
        assert!(matches!(
            f.service.retrieve(entry.id).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
