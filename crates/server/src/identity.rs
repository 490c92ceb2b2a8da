//! Bearer-token identity for request handlers.
//!
//! A missing `Authorization` header is an anonymous request; a present but
//! invalid one is rejected with 401.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use service::identity::Requester;

use crate::errors::ApiError;
use crate::state::AppState;

/// HS256 token claims: `sub` is the numeric user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: usize,
}

pub fn decode_requester(token: &str, secret: &str) -> Result<Requester, ApiError> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::new(Algorithm::HS256))
        .map_err(|e| {
            debug!(error = %e, "rejected bearer token");
            ApiError::Unauthorized("invalid token".into())
        })?;
    let id = data
        .claims
        .sub
        .parse::<i32>()
        .map_err(|_| ApiError::Unauthorized("invalid token subject".into()))?;
    Ok(Requester::new(id, data.claims.roles))
}

/// The requester, or `None` for anonymous visitors.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Requester>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(MaybeUser(None));
        };
        let token = header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".into()))?;
        decode_requester(token, &state.jwt_secret).map(|r| MaybeUser(Some(r)))
    }
}

/// An authenticated requester; anonymous requests get 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Requester);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match MaybeUser::from_request_parts(parts, state).await?.0 {
            Some(requester) => Ok(AuthUser(requester)),
            None => Err(ApiError::Unauthorized("authentication required".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(sub: &str, roles: &[&str], secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: (chrono::Utc::now().timestamp() + 600) as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn decodes_subject_and_roles() {
        let requester = decode_requester(&token("5", &["admin"], "s3cret"), "s3cret").unwrap();
        assert_eq!(requester.id, 5);
        assert!(requester.is_admin());
    }

    #[test]
    fn rejects_wrong_secret_and_bad_subject() {
        assert!(matches!(decode_requester(&token("5", &[], "a"), "b"), Err(ApiError::Unauthorized(_))));
        assert!(matches!(decode_requester(&token("abc", &[], "a"), "a"), Err(ApiError::Unauthorized(_))));
        assert!(decode_requester("not-a-jwt", "a").is_err());
    }
}
