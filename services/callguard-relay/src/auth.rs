//! Caller authentication.
//!
//! A request passes if it carries the shared API key in `x-api-key`, or a
//! `Bearer` JWT signed with that same key (HMAC). `exp` and `nbf` are
//! enforced when present but not required.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::RelayError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, RelayError> {
    authorize(request.headers(), &state.api_key)?;
    Ok(next.run(request).await)
}

pub fn authorize(headers: &HeaderMap, api_key: &str) -> Result<(), RelayError> {
    let supplied_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Some(key) = supplied_key {
        if bool::from(key.as_bytes().ct_eq(api_key.as_bytes())) {
            return Ok(());
        }
    }

    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        return verify_token(token, api_key).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            RelayError::InvalidToken
        });
    }

    Err(RelayError::Unauthorized)
}

fn verify_token(token: &str, secret: &str) -> Result<(), jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.required_spec_claims.clear();
    validation.validate_aud = false;
    validation.validate_nbf = true;

    decode::<Value>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)?;
    Ok(())
}
