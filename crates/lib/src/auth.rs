//! Caller credential check: `x-api-key` header against the configured secret.
//!
//! Plain equality. No hashing, rotation or rate limiting. When no secret is configured the
//! check passes; the server only allows that on a loopback bind.

use axum::http::HeaderMap;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing x-api-key header")]
    Missing,
    #[error("invalid api key")]
    Invalid,
}

/// Compare the request's `x-api-key` with `expected`.
pub fn check_api_key(headers: &HeaderMap, expected: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let Some(provided) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) else {
        log::warn!("unauthorized request, no {} header", API_KEY_HEADER);
        return Err(AuthError::Missing);
    };
    if provided == expected {
        Ok(())
    } else {
        log::warn!("unauthorized request, key used: {}", mask_key(provided));
        Err(AuthError::Invalid)
    }
}

/// First two characters then `***`, so logs identify a key without leaking it.
pub fn mask_key(key: &str) -> String {
    let head: String = key.chars().take(2).collect();
    format!("{}***", head)
}
