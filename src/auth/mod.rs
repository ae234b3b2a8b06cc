//! Caller identity for privileged endpoints.
//!
//! The backend issues HS256 access tokens signed with its JWT secret; the
//! `sub` claim is the profile id. Roles are never read from the token, they
//! come from the profile row.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::ServiceError;
use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Authentication is not configured")]
    NotConfigured,
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        ServiceError::Unauthorized(err.to_string())
    }
}

/// Claims of a backend access token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
}

/// Verified caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }
        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let verifier = state.auth.as_ref().ok_or(AuthError::NotConfigured)?;
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        Ok(verifier.verify(token).map_err(|e| {
            tracing::warn!(error = %e, "Rejected bearer token");
            e
        })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "backend-jwt-secret";

    fn token(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_one_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(SECRET, "authenticated")
    }

    #[test]
    fn accepts_backend_token() {
        let jwt = token(
            json!({"sub": "admin-1", "aud": "authenticated", "exp": in_one_hour(), "email": "a@b.io"}),
            SECRET,
        );
        let user = verifier().verify(&jwt).unwrap();
        assert_eq!(user.user_id, "admin-1");
        assert_eq!(user.email.as_deref(), Some("a@b.io"));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let jwt = token(
            json!({"sub": "admin-1", "aud": "authenticated", "exp": in_one_hour()}),
            "not-the-secret",
        );
        assert_eq!(verifier().verify(&jwt), Err(AuthError::InvalidToken));
    }

    #[test]
    fn rejects_expired_token() {
        let jwt = token(
            json!({"sub": "admin-1", "aud": "authenticated", "exp": chrono::Utc::now().timestamp() - 3600}),
            SECRET,
        );
        assert_eq!(verifier().verify(&jwt), Err(AuthError::TokenExpired));
    }

    #[test]
    fn rejects_wrong_audience_and_empty_subject() {
        let other_aud = token(
            json!({"sub": "admin-1", "aud": "service_role", "exp": in_one_hour()}),
            SECRET,
        );
        assert_eq!(verifier().verify(&other_aud), Err(AuthError::InvalidToken));

        let no_sub = token(
            json!({"sub": " ", "aud": "authenticated", "exp": in_one_hour()}),
            SECRET,
        );
        assert_eq!(verifier().verify(&no_sub), Err(AuthError::InvalidToken));
    }

    #[test]
    fn reads_bearer_scheme_case_insensitively() {
        let (mut parts, _) = axum::http::Request::builder()
            .header("authorization", "bearer abc.def.ghi")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));

        parts
            .headers
            .insert(header::AUTHORIZATION, "Basic dXNlcg==".parse().unwrap());
        assert_eq!(bearer_token(&parts), None);
    }
}
