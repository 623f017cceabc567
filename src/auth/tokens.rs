//! Session token issuance and verification
//!
//! Access and refresh tokens are HS256 JWTs sharing one secret. The
//! `token_type` claim keeps one kind from being accepted as the other.

use std::fmt;

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::{ApiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by every session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub token_type: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn principal(&self) -> Result<Principal> {
        let user_id = self
            .sub
            .parse()
            .map_err(|_| {
                ApiError::InvalidToken(
                    "Token contained no recognizable user identification".to_string(),
                )
            })?;
        Ok(Principal {
            user_id,
            username: self.username.clone(),
        })
    }
}

/// An access/refresh pair issued at login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("secret", &"[REDACTED]")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_secs: i64::try_from(access_ttl_secs).unwrap_or(i64::MAX / 2),
            refresh_ttl_secs: i64::try_from(refresh_ttl_secs).unwrap_or(i64::MAX / 2),
        }
    }

    pub fn issue_pair(&self, principal: &Principal) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.issue(principal, TokenKind::Access)?,
            refresh: self.issue(principal, TokenKind::Refresh)?,
        })
    }

    pub fn issue(&self, principal: &Principal, kind: TokenKind) -> Result<String> {
        let now = Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let claims = Claims {
            sub: principal.user_id.to_string(),
            username: principal.username.clone(),
            token_type: kind,
            iat: now,
            exp: now.saturating_add(ttl),
            jti: Uuid::new_v4().simple().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verifies signature, expiry and kind; returns the claims.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    ApiError::InvalidToken("Token is expired".to_string())
                }
                ErrorKind::InvalidSignature => {
                    ApiError::InvalidToken("Token signature is invalid".to_string())
                }
                _ => ApiError::InvalidToken("Token is invalid".to_string()),
            })?
            .claims;

        if claims.token_type != expected {
            return Err(ApiError::InvalidToken("Token has wrong type".to_string()));
        }
        Ok(claims)
    }
}
