//! Password hashing and the registration password policy
//!
//! Passwords are stored as Argon2id PHC strings
//! (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`), so the parameters travel
//! with every stored hash.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use uuid::Uuid;

use crate::error::{ApiError, Result};

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const PASSWORD_MISMATCH: &str = "Password fields didn't match.";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters long.";
pub const PASSWORD_NEEDS_LETTER: &str = "Password must include at least one letter.";
pub const PASSWORD_NEEDS_NUMBER: &str = "Password must include at least one number.";
pub const PASSWORD_NEEDS_SYMBOL: &str = "Password must include at least one symbol.";

/// Hashes `password` with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| ApiError::Internal(format!("Failed to encode password salt: {}", e)))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

/// Checks `password` against a stored PHC string; unparsable hashes never match.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(encoded) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Policy violations for a registration password, in a stable order.
pub fn policy_violations(password: &str, confirm: &str) -> Vec<&'static str> {
    let mut violations = Vec::new();
    if password != confirm {
        violations.push(PASSWORD_MISMATCH);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        violations.push(PASSWORD_TOO_SHORT);
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        violations.push(PASSWORD_NEEDS_LETTER);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push(PASSWORD_NEEDS_NUMBER);
    }
    if !password.chars().any(|c| !c.is_ascii_alphanumeric()) {
        violations.push(PASSWORD_NEEDS_SYMBOL);
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let encoded = hash_password("Secret#123").unwrap();
        assert!(encoded.starts_with("$argon2id$"));
        assert!(verify_password("Secret#123", &encoded));
        assert!(!verify_password("Secret#124", &encoded));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(
            hash_password("Secret#123").unwrap(),
            hash_password("Secret#123").unwrap()
        );
    }

    #[test]
    fn test_malformed_encoding_never_matches() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "md5$1$salt$abc"));
        assert!(!verify_password("x", "$argon2id$v=19$m=19456,t=2,p=1$bm90YXNhbHQ$"));
    }

    #[test]
    fn test_non_phc_digest_rejected() {
        let digest = "sha256$10000$0123456789abcdef$".to_string() + &"ab".repeat(32);
        assert!(!verify_password("Secret#123", &digest));
    }

    #[test]
    fn test_policy_accepts_strong_password() {
        assert!(policy_violations("Secret#123", "Secret#123").is_empty());
    }

    #[test]
    fn test_policy_violations() {
        assert_eq!(policy_violations("Secret#123", "Secret#12"), [PASSWORD_MISMATCH]);
        assert_eq!(policy_violations("S#1a", "S#1a"), [PASSWORD_TOO_SHORT]);
        assert_eq!(policy_violations("12345678#", "12345678#"), [PASSWORD_NEEDS_LETTER]);
        assert_eq!(policy_violations("abcdefgh#", "abcdefgh#"), [PASSWORD_NEEDS_NUMBER]);
        assert_eq!(policy_violations("abcdefgh1", "abcdefgh1"), [PASSWORD_NEEDS_SYMBOL]);
    }
}
