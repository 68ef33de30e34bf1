//! Bearer-token authentication for the undo routes.
//!
//! Access tokens are issued by the PageSpace auth service as HS256 JWTs whose
//! `sub` is the user id. This server only verifies them. [`sign_access_token`]
//! lets tests and local tooling mint one with the shared secret.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pagespace_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// Claims this server reads from an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// The user's id.
    pub sub: DbId,
    pub iat: i64,
    pub exp: i64,
}

/// Sign an access token for `user_id` valid for `ttl`.
pub fn sign_access_token(
    user_id: DbId,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = AccessClaims {
        sub: user_id,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify signature and expiry, returning the claims.
pub fn verify_access_token(
    token: &str,
    secret: &str,
) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
    let data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized("Missing Authorization header"))?;

    value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>",
        ))
}

/// The user an undo request acts on behalf of.
///
/// Becomes the `user_id` of every undo ledger entry the request writes.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let claims = verify_access_token(token, &state.config.jwt_secret).map_err(|err| {
            tracing::debug!(error = %err, "Rejected access token");
            AppError::Unauthorized("Invalid or expired token")
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
