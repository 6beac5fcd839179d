use lazy_static::lazy_static;
use regex::Regex;

use super::{
    dto::{AuthResponse, PublicUser},
    jwt::{JwtKeys, TokenError, TokenKind},
    repo_types::User,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Signs a fresh access/refresh pair for `user`.
pub(crate) fn issue_tokens(keys: &JwtKeys, user: User) -> Result<AuthResponse, TokenError> {
    let access_token = keys.sign(user.id, TokenKind::Access)?;
    let refresh_token = keys.sign(user.id, TokenKind::Refresh)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    })
}
