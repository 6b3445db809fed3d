//! Ops access guard.
//!
//! Bearer-token check in front of every ops route. When no token is
//! configured the guard lets everything through.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use clawkeeper_core::OpsError;

use crate::error::ApiError;
use crate::server::OpsState;

/// Extractor that succeeds only for callers presenting the access token.
pub struct RequireAccess;

#[async_trait]
impl FromRequestParts<OpsState> for RequireAccess {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &OpsState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.access_token.as_deref() else {
            return Ok(RequireAccess);
        };

        let presented = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|val| val.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "));

        match presented {
            Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => {
                Ok(RequireAccess)
            }
            Some(_) => {
                warn!(path = %parts.uri.path(), "Rejected ops request with invalid token");
                Err(OpsError::Unauthenticated("Invalid access token".into()).into())
            }
            None => {
                warn!(path = %parts.uri.path(), "Rejected ops request without credentials");
                Err(OpsError::Unauthenticated("Missing access token".into()).into())
            }
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_tokens() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secret2"));
    }
}
