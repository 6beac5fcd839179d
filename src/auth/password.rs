//! Argon2 password hashing for user accounts.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::http::StatusCode;
use rand::rngs::OsRng;
use tracing::error;

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password must be at least 8 characters")]
    TooShort,
    #[error("password hashing failed: {0}")]
    Hash(password_hash::Error),
}

impl PasswordError {
    pub fn rejection(self) -> ApiError {
        match self {
            PasswordError::TooShort => (StatusCode::BAD_REQUEST, self.to_string()),
            PasswordError::Hash(_) => {
                error!(error = %self, "argon2");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
            }
        }
    }
}

/// Hashes a new account password, enforcing the minimum length first.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(PasswordError::Hash)
}

/// `Ok(false)` for a wrong password; `Err` only when `hash` is unreadable.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(PasswordError::Hash)?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
