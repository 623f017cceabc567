//! Response DTOs for the tracker API
//!
//! Defines the structure of outgoing HTTP response bodies.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::cache::CacheStats;
use crate::models::{TreeEntry, User};

/// Header reporting whether a payload was served from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

// == Tree Entry ==
/// Wire representation of a tree entry.
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntryView {
    pub id: u64,
    /// Owner username
    pub user: String,
    pub species: String,
    pub latitude: f64,
    pub longitude: f64,
    pub date_planted: NaiveDate,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&TreeEntry> for TreeEntryView {
    fn from(entry: &TreeEntry) -> Self {
        Self {
            id: entry.id,
            user: entry.owner_username.clone(),
            species: entry.fields.species.clone(),
            latitude: entry.fields.latitude,
            longitude: entry.fields.longitude,
            date_planted: entry.fields.date_planted,
            photo: entry.fields.photo.clone(),
            created_at: entry.created_at,
        }
    }
}

// == Statistics ==
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesCount {
    pub species: String,
    pub count: u64,
}

/// Body of GET `/trees/my_stats/`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub total_trees: u64,
    pub species_diversity: u64,
    pub species_list: Vec<SpeciesCount>,
}

// == GeoJSON ==
/// A GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub geometry: PointGeometry,
    pub properties: FeatureProperties,
}

/// Point geometry; coordinates are `[longitude, latitude]`.
#[derive(Debug, Clone, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureProperties {
    pub id: u64,
    pub species: String,
    pub date_planted: NaiveDate,
    pub description: String,
    pub user: String,
}

impl Feature {
    /// Builds a point feature, or `None` when the entry lacks usable coordinates.
    pub fn from_entry(entry: &TreeEntry) -> Option<Self> {
        if !entry.has_coordinates() {
            return None;
        }
        Some(Self {
            kind: "Feature",
            geometry: PointGeometry {
                kind: "Point",
                coordinates: [entry.fields.longitude, entry.fields.latitude],
            },
            properties: FeatureProperties {
                id: entry.id,
                species: entry.fields.species.clone(),
                date_planted: entry.fields.date_planted,
                description: entry.describe(),
                user: entry.owner_username.clone(),
            },
        })
    }
}

// == Accounts ==
/// Public profile of an account.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginUser {
    pub username: String,
}

/// Body of POST `/login/`.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
    pub user: LoginUser,
}

/// Body of POST `/token/refresh/`.
#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

// == Health ==
/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Name of the configured cache backend
    pub cache_backend: &'static str,
    /// Counters of the cache backend, when it keeps any
    pub cache_stats: Option<CacheStats>,
}

impl HealthResponse {
    pub fn healthy(cache_backend: &'static str, cache_stats: Option<CacheStats>) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            cache_backend,
            cache_stats,
        }
    }
}

// == Cached Payload ==
/// Where a read payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// A serialized JSON response body as stored in the cache.
///
/// The body is returned verbatim, so a hit is byte-identical to the miss
/// that populated it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub body: String,
    pub status: CacheStatus,
}

impl Payload {
    pub fn hit(body: String) -> Self {
        Self {
            body,
            status: CacheStatus::Hit,
        }
    }

    pub fn miss(body: String) -> Self {
        Self {
            body,
            status: CacheStatus::Miss,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.status == CacheStatus::Hit
    }

    /// Parses the body back into JSON.
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.body)
    }
}

impl IntoResponse for Payload {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [
                (
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                ),
                (
                    header::HeaderName::from_static(CACHE_STATUS_HEADER),
                    HeaderValue::from_static(self.status.as_str()),
                ),
            ],
            self.body,
        )
            .into_response()
    }
}
