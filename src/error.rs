//! Error types for the tracker API
//!
//! Provides unified error handling using thiserror.

use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Field name used for errors that are not tied to a single input field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

// == Field Errors ==
/// Validation messages grouped by the offending field.
///
/// Serializes as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set holding a single message.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Messages recorded for `field`, empty when the field is valid.
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `Err(ApiError::Validation)` when any message was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

// == API Error Enum ==
/// Unified error type surfaced by services and HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Input rejected before any persistence or cache mutation
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Operation requires an authenticated caller
    #[error("Authentication required: {0}")]
    AuthRequired(String),

    /// Bearer or refresh token could not be verified
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Caller is authenticated but does not own the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request body sent with a content type no parser accepts
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// A body that could not be read or parsed, reported like a validation failure.
    pub fn malformed_body(detail: impl Into<String>) -> Self {
        ApiError::Validation(FieldErrors::single(NON_FIELD_ERRORS, detail))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthRequired(_) | ApiError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Conflict(msg) => {
                ApiError::Validation(FieldErrors::single(NON_FIELD_ERRORS, msg))
            }
            StoreError::Unexpected(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(missing) => {
                ApiError::UnsupportedMediaType(missing.body_text())
            }
            other => ApiError::malformed_body(other.body_text()),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if let ApiError::Internal(msg) = &self {
            tracing::error!(error = %msg, "request failed");
        }

        let body = match self {
            ApiError::Validation(errors) => Json(json!(errors)),
            ApiError::AuthRequired(msg)
            | ApiError::InvalidToken(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::UnsupportedMediaType(msg)
            | ApiError::Internal(msg) => Json(json!({ "error": msg })),
        };

        (status, body).into_response()
    }
}

// == Cache Error Enum ==
/// Errors raised inside the in-memory cache store.
///
/// These never reach a request handler: the `Cache` trait swallows them.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key has expired
    #[error("Key expired: {0}")]
    Expired(String),

    /// Key or value rejected by size limits
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// Cache is full and eviction failed
    #[error("Cache full: {0}")]
    CacheFull(String),
}

// == Result Type Aliases ==
/// Convenience Result type for services and handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Result type for in-memory cache store operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
