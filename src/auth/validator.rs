//! Authentication validator
//!
//! Extracts the bearer token from an `Authorization` header and resolves it
//! to an actor.

use super::credentials::{Actor, CredentialStore};
use crate::error::AuthError;

const MAX_TOKEN_LENGTH: usize = 512;

/// Performs basic input sanitation to check for malicious or malformed tokens.
fn is_valid_input(input: &str, max_length: usize) -> bool {
    !input.trim().is_empty()
        && input.len() <= max_length
        && !input.chars().any(|c| c.is_control() || c.is_whitespace())
}

/// Returns the token of a `Bearer <token>` header value.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.map(str::trim).filter(|h| !h.is_empty());
    let Some(header) = header else {
        return Err(AuthError::MissingCredentials);
    };

    let (scheme, token) = header.split_once(' ').ok_or(AuthError::InvalidToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidToken);
    }

    let token = token.trim();
    if !is_valid_input(token, MAX_TOKEN_LENGTH) {
        return Err(AuthError::InvalidToken);
    }
    Ok(token)
}

/// Validates the header against the credential store.
pub fn authenticate(header: Option<&str>, credentials: &CredentialStore) -> Result<Actor, AuthError> {
    let token = parse_bearer(header)?;
    credentials.lookup(token).ok_or(AuthError::InvalidToken)
}
