use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use tracing::warn;

use super::{cookie::extract_session_token, jwt::Identity, jwt::JwtKeys};
use crate::error::ApiError;

/// Auth gate shared by every adapter: no cookie → `AuthRequired`, bad or
/// expired token → `InvalidToken`, otherwise the verified identity.
pub fn authenticate(headers: &HeaderMap, keys: &JwtKeys) -> Result<Identity, ApiError> {
    let token = extract_session_token(headers).ok_or(ApiError::AuthRequired)?;
    keys.verify(&token).map_err(|e| {
        warn!(error = %e, "rejected session token");
        ApiError::InvalidToken
    })
}

/// Verified caller identity, re-checked on every request.
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        authenticate(&parts.headers, &keys).map(AuthUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::JwtConfig, store::Role};
    use axum::http::{header, HeaderValue};

    fn keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: "gate-secret".into(),
            issuer: "kodbank".into(),
            audience: "kodbank-web".into(),
            ttl_minutes: 5,
        })
    }

    fn with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn no_token_requires_authentication() {
        let err = authenticate(&HeaderMap::new(), &keys()).unwrap_err();
        assert!(matches!(err, ApiError::AuthRequired));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let err = authenticate(&with_cookie("token=not-a-jwt"), &keys()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[test]
    fn valid_token_attaches_identity() {
        let keys = keys();
        let token = keys.issue("alice", Role::Customer).unwrap().token;
        let identity = authenticate(&with_cookie(&format!("token={token}")), &keys).unwrap();
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.role, Role::Customer);
    }
}
