//! Account registration, login and token refresh

use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::passwords::{hash_password, policy_violations, verify_password};
use crate::auth::{Principal, TokenIssuer, TokenKind};
use crate::error::{ApiError, FieldErrors, Result};
use crate::models::requests::{required_text, BLANK, REQUIRED};
use crate::models::responses::LoginUser;
use crate::models::{
    AccessTokenResponse, LoginRequest, NewUser, RefreshRequest, RegisterRequest,
    TokenPairResponse, User, UserProfile,
};
use crate::store::{StoreError, UserStore};

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const EMAIL_TAKEN: &str = "A user with that email already exists.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    tokens: TokenIssuer,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenIssuer) -> Self {
        Self { users, tokens }
    }

    /// Creates an account; every problem is reported under its field.
    pub async fn register(&self, req: &RegisterRequest) -> Result<UserProfile> {
        let mut errors = FieldErrors::new();
        let first_name = required_text(&mut errors, "first_name", &req.first_name);
        let last_name = required_text(&mut errors, "last_name", &req.last_name);
        let username = required_text(&mut errors, "username", &req.username);
        let email = required_text(&mut errors, "email", &req.email);
        let password = required_secret(&mut errors, "password", &req.password);
        let confirm = required_secret(&mut errors, "confirm_password", &req.confirm_password);

        if !username.is_empty() && self.users.username_taken(&username).await? {
            errors.add("username", USERNAME_TAKEN);
        }
        if !email.is_empty() {
            if !looks_like_email(&email) {
                errors.add("email", INVALID_EMAIL);
            } else if self.users.email_taken(&email).await? {
                errors.add("email", EMAIL_TAKEN);
            }
        }
        if let (Some(password), Some(confirm)) = (&password, &confirm) {
            for violation in policy_violations(password, confirm) {
                errors.add("password", violation);
            }
        }
        errors.into_result()?;

        let password = password.unwrap_or_default();
        let user = self
            .users
            .insert_user(NewUser {
                first_name,
                last_name,
                username,
                email,
                password_hash: hash_password(&password)?,
            })
            .await?;
        info!(user_id = user.id, username = %user.username, "account registered");
        Ok(UserProfile::from(&user))
    }

    /// Exchanges credentials for an access/refresh token pair.
    pub async fn login(&self, req: &LoginRequest) -> Result<TokenPairResponse> {
        let mut errors = FieldErrors::new();
        let username = required_text(&mut errors, "username", &req.username);
        let password = required_secret(&mut errors, "password", &req.password);
        errors.into_result()?;
        let password = password.unwrap_or_default();

        let user = match self.users.user_by_username(&username).await? {
            Some(user) if verify_password(&password, &user.password_hash) => user,
            _ => {
                warn!(username = %username, "login failed");
                return Err(ApiError::AuthRequired(BAD_CREDENTIALS.to_string()));
            }
        };

        let pair = self.tokens.issue_pair(&principal_of(&user))?;
        info!(user_id = user.id, "login succeeded");
        Ok(TokenPairResponse {
            access: pair.access,
            refresh: pair.refresh,
            user: LoginUser {
                username: user.username,
            },
        })
    }

    /// Issues a fresh access token for a valid refresh token.
    pub async fn refresh(&self, req: &RefreshRequest) -> Result<AccessTokenResponse> {
        let mut errors = FieldErrors::new();
        let token = required_secret(&mut errors, "refresh", &req.refresh);
        errors.into_result()?;
        let token = token.unwrap_or_default();

        let claims = self.tokens.verify(&token, TokenKind::Refresh)?;
        let user = self.active_user(claims.principal()?.user_id).await?;
        let access = self.tokens.issue(&principal_of(&user), TokenKind::Access)?;
        Ok(AccessTokenResponse { access })
    }

    pub async fn current_user(&self, principal: &Principal) -> Result<UserProfile> {
        let user = self.active_user(principal.user_id).await?;
        Ok(UserProfile::from(&user))
    }

    /// Resolves a bearer access token to the caller it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<Principal> {
        let claims = self.tokens.verify(token, TokenKind::Access).map_err(|err| {
            warn!(error = %err, "bearer token rejected");
            err
        })?;
        let user = self.active_user(claims.principal()?.user_id).await?;
        Ok(principal_of(&user))
    }

    async fn active_user(&self, user_id: u64) -> Result<User> {
        match self.users.user_by_id(user_id).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound(_)) => {
                Err(ApiError::InvalidToken("User not found".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn principal_of(user: &User) -> Principal {
    Principal {
        user_id: user.id,
        username: user.username.clone(),
    }
}

/// Like `required_text`, without trimming: whitespace is part of a secret.
fn required_secret(errors: &mut FieldErrors, field: &str, value: &Option<String>) -> Option<String> {
    match value {
        Some(v) if !v.is_empty() => Some(v.clone()),
        Some(_) => {
            errors.add(field, BLANK);
            None
        }
        None => {
            errors.add(field, REQUIRED);
            None
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}
