//! Session tokens and the request extractors built on them.
//!
//! A session is an HS256 JWT issued by the sign-in callback. The premium flag
//! it carries reflects sign-in time only; [`CurrentViewer`] re-reads it from
//! the store through the access gate on every request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use chrono::{Duration, Utc};
use esfinteres_core::{SessionUser, Viewer};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User email.
    pub sub: String,
    pub name: String,
    /// Premium flag at sign-in time.
    pub premium: bool,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn session_user(&self) -> SessionUser {
        SessionUser {
            email: self.sub.clone(),
            name: self.name.clone(),
        }
    }
}

pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, email: &str, name: &str, premium: bool) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: email.to_string(),
            name: name.to_string(),
            premium,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign session: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, ApiError> {
        decode::<SessionClaims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected session token");
                ApiError::Unauthorized
            })
    }
}

async fn bearer_token(parts: &mut Parts, state: &AppState) -> Result<String, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::Unauthorized)?;
    Ok(bearer.token().to_string())
}

/// The authenticated requester with a tier freshly resolved from the store.
///
/// ```ignore
/// async fn handler(CurrentViewer(viewer): CurrentViewer) -> String {
///     viewer.email
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentViewer(pub Viewer);

impl FromRequestParts<AppState> for CurrentViewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = match bearer_token(parts, state).await {
            Ok(token) => Some(state.sessions().verify(&token)?.session_user()),
            Err(_) => None,
        };
        let viewer = state.gate().authorize(session.as_ref()).await?;
        Ok(CurrentViewer(viewer))
    }
}

/// Admits requests bearing the configured `ADMIN_TOKEN`. Refuses everything
/// when no token is configured.
#[derive(Debug, Clone, Copy)]
pub struct AdminGuard;

impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config().admin_token.as_deref() else {
            return Err(ApiError::Forbidden("admin routes are disabled".into()));
        };
        let token = bearer_token(parts, state).await?;
        if token != expected {
            tracing::warn!("admin request with wrong token");
            return Err(ApiError::Unauthorized);
        }
        Ok(AdminGuard)
    }
}
