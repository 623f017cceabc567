//! Durable store seam
//!
//! Services only see the `TreeStore` and `UserStore` traits. The crate ships
//! an in-memory implementation; a relational backend plugs in behind the
//! same traits.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{NewUser, TreeEntry, TreeFields, User};

mod memory;
mod query;

pub use memory::InMemoryStore;
pub use query::{TreeOrdering, TreeQuery};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
    /// A uniqueness constraint rejected the write
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Message attached to a violation of the per-owner planting uniqueness rule.
pub const DUPLICATE_TREE: &str =
    "You have already added a tree of this species at this location on this date.";

#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Persists a new entry; `Conflict` when the owner already has the same planting.
    async fn insert_tree(&self, owner_id: u64, fields: TreeFields) -> StoreResult<TreeEntry>;
    async fn get_tree(&self, id: u64) -> StoreResult<TreeEntry>;
    /// Replaces the editable fields; owner and `created_at` never change.
    async fn update_tree(&self, id: u64, fields: TreeFields) -> StoreResult<TreeEntry>;
    /// Removes the entry and returns what was removed.
    async fn delete_tree(&self, id: u64) -> StoreResult<TreeEntry>;
    async fn list_trees(&self, query: &TreeQuery) -> StoreResult<Vec<TreeEntry>>;
    /// All entries of one owner, newest planting first.
    async fn trees_for_owner(&self, owner_id: u64) -> StoreResult<Vec<TreeEntry>>;
    /// True when `owner_id` already has an entry colliding with `fields`,
    /// ignoring the entry `exclude`.
    async fn duplicate_exists(
        &self,
        owner_id: u64,
        fields: &TreeFields,
        exclude: Option<u64>,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persists a new account; `Conflict` on a taken username or email.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn user_by_id(&self, id: u64) -> StoreResult<User>;
    async fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn username_taken(&self, username: &str) -> StoreResult<bool>;
    async fn email_taken(&self, email: &str) -> StoreResult<bool>;
}
