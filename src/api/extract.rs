//! Request extractors
//!
//! [`Caller`] resolves the optional `Authorization: Bearer` header into a
//! [`Principal`]. A missing header means an anonymous caller; a present but
//! invalid token rejects the request with 401. Token endpoints do not use it.
//!
//! [`TreeBody`] reads a tree write from JSON, urlencoded or multipart bodies.

use std::collections::HashMap;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Multipart, Request},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
    },
    Form, Json,
};

use super::handlers::AppState;
use crate::auth::Principal;
use crate::error::ApiError;
use crate::models::{PhotoUpload, TreeEntryRequest};

const BEARER: &str = "Bearer";

/// The authenticated caller, if any.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<Principal>);

impl Caller {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Caller(None));
        };
        let header = header.to_str().map_err(|_| {
            ApiError::InvalidToken("Authorization header must contain printable characters".to_string())
        })?;

        let mut words = header.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            // Other schemes are left to other authenticators; here they mean anonymous
            (Some(scheme), _, _) if !scheme.eq_ignore_ascii_case(BEARER) => Ok(Caller(None)),
            (Some(_), Some(token), None) => {
                let principal = state.accounts.authenticate(token).await?;
                Ok(Caller(Some(principal)))
            }
            (None, _, _) => Ok(Caller(None)),
            _ => Err(ApiError::InvalidToken(
                "Invalid Authorization header. Expected 'Bearer <token>'.".to_string(),
            )),
        }
    }
}

/// Body of a tree create or update, in any accepted encoding.
#[derive(Debug, Clone, Default)]
pub struct TreeBody {
    pub request: TreeEntryRequest,
    /// File sent as the multipart `photo` part
    pub photo: Option<PhotoUpload>,
}

#[async_trait]
impl<S> FromRequest<S> for TreeBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "application/json" => json_body(req, state).await,
            m if m.starts_with("application/") && m.ends_with("+json") => {
                json_body(req, state).await
            }
            "application/x-www-form-urlencoded" => {
                let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                    .await
                    .map_err(|e| ApiError::malformed_body(e.body_text()))?;
                Ok(Self {
                    request: TreeEntryRequest::from_form(&fields),
                    photo: None,
                })
            }
            "multipart/form-data" => {
                let multipart = Multipart::from_request(req, state)
                    .await
                    .map_err(|e| ApiError::malformed_body(e.body_text()))?;
                multipart_body(multipart).await
            }
            "" => {
                // No declared type is only acceptable without a body
                let bytes = Bytes::from_request(req, state)
                    .await
                    .map_err(|e| ApiError::malformed_body(e.body_text()))?;
                if bytes.is_empty() {
                    Ok(Self::default())
                } else {
                    Err(unsupported(&content_type))
                }
            }
            _ => Err(unsupported(&content_type)),
        }
    }
}

async fn json_body<S: Send + Sync>(req: Request, state: &S) -> Result<TreeBody, ApiError> {
    let Json(request) = Json::<TreeEntryRequest>::from_request(req, state).await?;
    Ok(TreeBody {
        request,
        photo: None,
    })
}

async fn multipart_body(mut multipart: Multipart) -> Result<TreeBody, ApiError> {
    let mut fields = HashMap::new();
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::malformed_body(format!("Invalid multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        match file_name {
            Some(file_name) if name == "photo" => {
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::malformed_body(format!("Invalid multipart field: {}", e))
                })?;
                // An unchosen file input arrives as an empty part with an empty name
                if !(file_name.is_empty() && bytes.is_empty()) {
                    photo = Some(PhotoUpload {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            _ => {
                let text = field.text().await.map_err(|e| {
                    ApiError::malformed_body(format!("Invalid multipart field text: {}", e))
                })?;
                fields.insert(name, text);
            }
        }
    }

    Ok(TreeBody {
        request: TreeEntryRequest::from_form(&fields),
        photo,
    })
}

fn unsupported(content_type: &str) -> ApiError {
    ApiError::UnsupportedMediaType(format!(
        "Unsupported media type \"{}\" in request.",
        content_type
    ))
}

/// Parses a path id; anything but a number is an unknown entry.
pub fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("Not found.".to_string()))
}
