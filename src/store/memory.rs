//! In-memory implementation of the durable store.
//!
//! Tables are `HashMap`/`BTreeMap`s guarded by `tokio::sync::RwLock`. State
//! is lost on restart; the store exists for local runs and tests, where it
//! also counts tree-table queries so cache behavior can be observed.
//!
//! Lock order is always trees before users.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{StoreError, StoreResult, TreeQuery, TreeStore, UserStore, DUPLICATE_TREE};
use crate::models::{NewUser, TreeEntry, TreeFields, User};

/// Row of the tree table; the owner username is joined in on read.
#[derive(Debug, Clone)]
struct TreeRow {
    id: u64,
    owner_id: u64,
    fields: TreeFields,
    created_at: DateTime<Utc>,
}

impl TreeRow {
    fn to_entry(&self, users: &HashMap<u64, User>) -> TreeEntry {
        TreeEntry {
            id: self.id,
            owner_id: self.owner_id,
            owner_username: users
                .get(&self.owner_id)
                .map(|u| u.username.clone())
                .unwrap_or_default(),
            fields: self.fields.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<u64, User>>>,
    trees: Arc<RwLock<BTreeMap<u64, TreeRow>>>,
    next_user_id: AtomicU64,
    next_tree_id: AtomicU64,
    /// Number of calls made through `TreeStore`
    tree_queries: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tree-table queries served so far.
    pub fn query_count(&self) -> u64 {
        self.tree_queries.load(Ordering::SeqCst)
    }

    fn record_query(&self) {
        self.tree_queries.fetch_add(1, Ordering::SeqCst);
    }

    fn collides(
        rows: &BTreeMap<u64, TreeRow>,
        owner_id: u64,
        fields: &TreeFields,
        exclude: Option<u64>,
    ) -> bool {
        rows.values().any(|row| {
            row.owner_id == owner_id
                && Some(row.id) != exclude
                && row.fields.same_planting(fields)
        })
    }

    async fn collect_sorted(
        &self,
        keep: impl Fn(&TreeEntry) -> bool,
        query: &TreeQuery,
    ) -> Vec<TreeEntry> {
        let trees = self.trees.read().await;
        let users = self.users.read().await;
        let mut entries: Vec<TreeEntry> = trees
            .values()
            .map(|row| row.to_entry(&users))
            .filter(|entry| keep(entry))
            .collect();
        entries.sort_by(|a, b| query.ordering.compare(a, b));
        entries
    }
}

#[async_trait]
impl TreeStore for InMemoryStore {
    async fn insert_tree(&self, owner_id: u64, fields: TreeFields) -> StoreResult<TreeEntry> {
        self.record_query();
        let mut trees = self.trees.write().await;
        if Self::collides(&trees, owner_id, &fields, None) {
            return Err(StoreError::Conflict(DUPLICATE_TREE.to_string()));
        }

        let id = self.next_tree_id.fetch_add(1, Ordering::SeqCst) + 1;
        let row = TreeRow {
            id,
            owner_id,
            fields,
            created_at: Utc::now(),
        };
        trees.insert(id, row.clone());

        let users = self.users.read().await;
        Ok(row.to_entry(&users))
    }

    async fn get_tree(&self, id: u64) -> StoreResult<TreeEntry> {
        self.record_query();
        let trees = self.trees.read().await;
        let users = self.users.read().await;
        trees
            .get(&id)
            .map(|row| row.to_entry(&users))
            .ok_or_else(|| StoreError::NotFound(format!("Tree entry {} not found", id)))
    }

    async fn update_tree(&self, id: u64, fields: TreeFields) -> StoreResult<TreeEntry> {
        self.record_query();
        let mut trees = self.trees.write().await;
        let owner_id = trees
            .get(&id)
            .map(|row| row.owner_id)
            .ok_or_else(|| StoreError::NotFound(format!("Tree entry {} not found", id)))?;
        if Self::collides(&trees, owner_id, &fields, Some(id)) {
            return Err(StoreError::Conflict(DUPLICATE_TREE.to_string()));
        }

        let users = self.users.read().await;
        match trees.get_mut(&id) {
            Some(row) => {
                row.fields = fields;
                Ok(row.to_entry(&users))
            }
            None => Err(StoreError::NotFound(format!("Tree entry {} not found", id))),
        }
    }

    async fn delete_tree(&self, id: u64) -> StoreResult<TreeEntry> {
        self.record_query();
        let mut trees = self.trees.write().await;
        let row = trees
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("Tree entry {} not found", id)))?;
        let users = self.users.read().await;
        Ok(row.to_entry(&users))
    }

    async fn list_trees(&self, query: &TreeQuery) -> StoreResult<Vec<TreeEntry>> {
        self.record_query();
        Ok(self.collect_sorted(|entry| query.matches(entry), query).await)
    }

    async fn trees_for_owner(&self, owner_id: u64) -> StoreResult<Vec<TreeEntry>> {
        self.record_query();
        Ok(self
            .collect_sorted(|entry| entry.owner_id == owner_id, &TreeQuery::default())
            .await)
    }

    async fn duplicate_exists(
        &self,
        owner_id: u64,
        fields: &TreeFields,
        exclude: Option<u64>,
    ) -> StoreResult<bool> {
        self.record_query();
        let trees = self.trees.read().await;
        Ok(Self::collides(&trees, owner_id, fields, exclude))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(
                "A user with that username already exists.".to_string(),
            ));
        }
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::Conflict(
                "A user with that email already exists.".to_string(),
            ));
        }

        let id = self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
        let stored = User {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            date_joined: Utc::now(),
        };
        users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn user_by_id(&self, id: u64) -> StoreResult<User> {
        let users = self.users.read().await;
        users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("User {} not found", id)))
    }

    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn username_taken(&self, username: &str) -> StoreResult<bool> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.username == username))
    }

    async fn email_taken(&self, email: &str) -> StoreResult<bool> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.email.eq_ignore_ascii_case(email)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "x".to_string(),
        }
    }

    fn fields(species: &str, lat: f64, day: u32) -> TreeFields {
        TreeFields {
            species: species.to_string(),
            latitude: lat,
            longitude: 1.0,
            date_planted: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            photo: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_joins_username() {
        let store = InMemoryStore::new();
        let alice = store.insert_user(new_user("alice")).await.unwrap();
        let tree = store.insert_tree(alice.id, fields("Oak", 1.0, 28)).await.unwrap();

        let loaded = store.get_tree(tree.id).await.unwrap();
        assert_eq!(loaded.owner_username, "alice");
        assert_eq!(loaded.fields.species, "Oak");
        assert_eq!(store.query_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_planting_conflicts_per_owner() {
        let store = InMemoryStore::new();
        let alice = store.insert_user(new_user("alice")).await.unwrap();
        let bob = store.insert_user(new_user("bob")).await.unwrap();

        store.insert_tree(alice.id, fields("Oak", 1.0, 28)).await.unwrap();
        let dup = store.insert_tree(alice.id, fields("Oak", 1.0, 28)).await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));

        // Same planting by another owner is fine
        assert!(store.insert_tree(bob.id, fields("Oak", 1.0, 28)).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_conflict_excludes_self() {
        let store = InMemoryStore::new();
        let alice = store.insert_user(new_user("alice")).await.unwrap();
        let first = store.insert_tree(alice.id, fields("Oak", 1.0, 28)).await.unwrap();
        let second = store.insert_tree(alice.id, fields("Oak", 2.0, 28)).await.unwrap();

        // Re-saving unchanged fields is not a conflict
        assert!(store.update_tree(first.id, fields("Oak", 1.0, 28)).await.is_ok());
        // Moving onto another entry's planting is
        let moved = store.update_tree(second.id, fields("Oak", 1.0, 28)).await;
        assert!(matches!(moved, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_orders_by_date_desc() {
        let store = InMemoryStore::new();
        let alice = store.insert_user(new_user("alice")).await.unwrap();
        store.insert_tree(alice.id, fields("Oak", 1.0, 28)).await.unwrap();
        store.insert_tree(alice.id, fields("Maple", 2.0, 30)).await.unwrap();
        store.insert_tree(alice.id, fields("Birch", 3.0, 29)).await.unwrap();

        let listed = store.list_trees(&TreeQuery::default()).await.unwrap();
        let species: Vec<&str> = listed.iter().map(|e| e.fields.species.as_str()).collect();
        assert_eq!(species, ["Maple", "Birch", "Oak"]);
    }

    #[tokio::test]
    async fn test_delete_returns_removed_entry() {
        let store = InMemoryStore::new();
        let alice = store.insert_user(new_user("alice")).await.unwrap();
        let tree = store.insert_tree(alice.id, fields("Oak", 1.0, 28)).await.unwrap();

        let removed = store.delete_tree(tree.id).await.unwrap();
        assert_eq!(removed.owner_id, alice.id);
        assert!(matches!(store.get_tree(tree.id).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let store = InMemoryStore::new();
        store.insert_user(new_user("alice")).await.unwrap();
        assert!(store.username_taken("alice").await.unwrap());
        assert!(store.email_taken("ALICE@example.com").await.unwrap());
        assert!(matches!(
            store.insert_user(new_user("alice")).await,
            Err(StoreError::Conflict(_))
        ));
    }
}
