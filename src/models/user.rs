//! User account types

use chrono::{DateTime, Utc};

/// A registered account.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string produced by `auth::passwords::hash_password`
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}

/// Account data accepted by the store on registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}
