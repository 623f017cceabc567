//! Domain types and request/response models for the tracker API
//!
//! This module defines the stored entities and the DTOs used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;
pub mod tree;
pub mod user;

// Re-export commonly used types
pub use requests::{
    LoginRequest, NumberInput, PhotoUpload, RefreshRequest, RegisterRequest, TreeEntryRequest,
    WriteMode,
};
pub use responses::{
    AccessTokenResponse, CacheStatus, Feature, FeatureCollection, HealthResponse, Payload,
    SpeciesCount, StatsResponse, TokenPairResponse, TreeEntryView, UserProfile,
};
pub use tree::{TreeEntry, TreeFields};
pub use user::{NewUser, User};
