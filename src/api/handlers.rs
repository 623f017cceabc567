//! API Handlers
//!
//! HTTP request handlers for each tracker endpoint. Every handler checks the
//! capability table before reading its body or touching a service.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use tokio::sync::RwLock;

use super::extract::{parse_id, Caller, TreeBody};
use crate::auth::{authorize, authorize_principal, Operation, Principal, TokenIssuer};
use crate::cache::{Cache, CacheStore, MemoryCache, NoopCache};
use crate::config::{CacheBackend, Config};
use crate::error::{ApiError, Result};
use crate::models::{
    AccessTokenResponse, HealthResponse, LoginRequest, Payload, RefreshRequest, RegisterRequest,
    TokenPairResponse, TreeEntry, TreeEntryRequest, TreeEntryView, UserProfile, WriteMode,
};
use crate::services::{AccountService, Aggregator, EntryService, PhotoStore};
use crate::store::{InMemoryStore, TreeStore, UserStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub entries: Arc<EntryService>,
    pub aggregator: Arc<Aggregator>,
    pub accounts: Arc<AccountService>,
    pub photos: Arc<PhotoStore>,
    pub cache: Arc<dyn Cache>,
    /// Backing store of the in-memory cache, swept by the expiry task
    pub cache_store: Option<Arc<RwLock<CacheStore>>>,
}

impl AppState {
    /// Wires the services over one durable store and one cache.
    pub fn new<S>(store: Arc<S>, cache: Arc<dyn Cache>, config: &Config) -> Self
    where
        S: TreeStore + UserStore + 'static,
    {
        let trees: Arc<dyn TreeStore> = store.clone();
        let users: Arc<dyn UserStore> = store;
        let tokens = TokenIssuer::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        );

        Self {
            entries: Arc::new(EntryService::new(Arc::clone(&trees), Arc::clone(&cache))),
            aggregator: Arc::new(Aggregator::new(trees, Arc::clone(&cache))),
            accounts: Arc::new(AccountService::new(users, tokens)),
            photos: Arc::new(PhotoStore::new(config.media_root.clone())),
            cache,
            cache_store: None,
        }
    }

    /// Creates the state from configuration, over a fresh in-memory store.
    pub fn from_config(config: &Config) -> Self {
        let store = Arc::new(InMemoryStore::new());
        match config.cache_backend {
            CacheBackend::Memory => {
                let cache = MemoryCache::new(config.cache_max_entries);
                let shared = cache.shared_store();
                let mut state = Self::new(store, Arc::new(cache), config);
                state.cache_store = Some(shared);
                state
            }
            CacheBackend::None => Self::new(store, Arc::new(NoopCache), config),
        }
    }
}

// == Accounts ==

/// Handler for POST /register/
pub async fn register_handler(
    State(state): State<AppState>,
    caller: Caller,
    body: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    authorize(Operation::Register, caller.principal())?;
    let Json(req) = body?;
    let profile = state.accounts.register(&req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Handler for POST /login/
///
/// Ignores any `Authorization` header, so a stale token never blocks a login.
pub async fn login_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenPairResponse>> {
    authorize(Operation::Login, None)?;
    let Json(req) = body?;
    Ok(Json(state.accounts.login(&req).await?))
}

/// Handler for POST /token/refresh/
///
/// Like login, authenticated by the body alone.
pub async fn refresh_handler(
    State(state): State<AppState>,
    body: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AccessTokenResponse>> {
    authorize(Operation::RefreshToken, None)?;
    let Json(req) = body?;
    Ok(Json(state.accounts.refresh(&req).await?))
}

/// Handler for GET /users/
pub async fn current_user_handler(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<UserProfile>> {
    let principal = authorize_principal(Operation::CurrentUser, caller.principal())?;
    Ok(Json(state.accounts.current_user(principal).await?))
}

// == Trees ==

/// Handler for GET /trees/
pub async fn list_trees_handler(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Payload> {
    authorize(Operation::ListTrees, caller.principal())?;
    state.entries.list(&params).await
}

/// Handler for POST /trees/
///
/// Accepts JSON, urlencoded and multipart bodies; a multipart `photo` file
/// is stored before the entry is written and removed again if it fails.
pub async fn create_tree_handler(
    State(state): State<AppState>,
    caller: Caller,
    body: std::result::Result<TreeBody, ApiError>,
) -> Result<(StatusCode, Json<TreeEntryView>)> {
    let principal = authorize_principal(Operation::CreateTree, caller.principal())?;
    let (req, stored) = attach_photo(&state, body?).await?;
    let created = state.entries.create(principal, &req).await;
    let entry = settle_photo(&state, created, stored).await?;
    Ok((StatusCode::CREATED, Json(TreeEntryView::from(&entry))))
}

/// Handler for GET /trees/{id}/
pub async fn retrieve_tree_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<TreeEntryView>> {
    authorize(Operation::RetrieveTree, caller.principal())?;
    let entry = state.entries.retrieve(parse_id(&id)?).await?;
    Ok(Json(TreeEntryView::from(&entry)))
}

/// Handler for PUT /trees/{id}/
pub async fn update_tree_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    body: std::result::Result<TreeBody, ApiError>,
) -> Result<Json<TreeEntryView>> {
    let principal = authorize_principal(Operation::UpdateTree, caller.principal())?;
    write_tree(&state, principal, &id, body, WriteMode::Replace).await
}

/// Handler for PATCH /trees/{id}/
pub async fn partial_update_tree_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    body: std::result::Result<TreeBody, ApiError>,
) -> Result<Json<TreeEntryView>> {
    let principal = authorize_principal(Operation::PartialUpdateTree, caller.principal())?;
    write_tree(&state, principal, &id, body, WriteMode::Patch).await
}

async fn write_tree(
    state: &AppState,
    principal: &Principal,
    id: &str,
    body: std::result::Result<TreeBody, ApiError>,
    mode: WriteMode,
) -> Result<Json<TreeEntryView>> {
    let id = parse_id(id)?;
    let (req, stored) = attach_photo(state, body?).await?;
    let updated = state.entries.update(principal, id, &req, mode).await;
    let entry = settle_photo(state, updated, stored).await?;
    Ok(Json(TreeEntryView::from(&entry)))
}

/// Stores an uploaded photo and points the request at it.
async fn attach_photo(
    state: &AppState,
    body: TreeBody,
) -> Result<(TreeEntryRequest, Option<String>)> {
    let TreeBody { mut request, photo } = body;
    let Some(upload) = photo else {
        return Ok((request, None));
    };
    let reference = state.photos.save(&upload).await?;
    request.photo = Some(reference.clone());
    Ok((request, Some(reference)))
}

/// Drops the stored photo when the write it belonged to failed.
async fn settle_photo(
    state: &AppState,
    outcome: Result<TreeEntry>,
    stored: Option<String>,
) -> Result<TreeEntry> {
    if let (Err(_), Some(reference)) = (&outcome, &stored) {
        state.photos.discard(reference).await;
    }
    outcome
}

/// Handler for DELETE /trees/{id}/
pub async fn destroy_tree_handler(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let principal = authorize_principal(Operation::DestroyTree, caller.principal())?;
    state.entries.delete(principal, parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /trees/my_stats/
pub async fn my_stats_handler(State(state): State<AppState>, caller: Caller) -> Result<Payload> {
    let principal = authorize_principal(Operation::MyStats, caller.principal())?;
    state.aggregator.my_stats(principal).await
}

/// Handler for GET /trees/geojson/
pub async fn geojson_handler(State(state): State<AppState>, caller: Caller) -> Result<Payload> {
    let viewer = authorize(Operation::GeoJson, caller.principal())?;
    state.aggregator.geojson(viewer).await
}

// == Health ==

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    authorize(Operation::Health, None)?;
    Ok(Json(HealthResponse::healthy(
        state.cache.backend_name(),
        state.cache.stats().await,
    )))
}
