use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::{config::JwtConfig, state::AppState, store::Role};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid or expired token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// A freshly signed token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Identity attached to a request once its token verifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_secs() as u64),
        }
    }

    pub fn issue(&self, username: &str, role: Role) -> Result<SignedToken, TokenError> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: username.to_string(),
            role,
            iat: now.unix_timestamp() as usize,
            exp: expires_at.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(username, role = %role, "jwt signed");
        Ok(SignedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(username = %data.claims.sub, "jwt verified");
        Ok(Identity {
            username: data.claims.sub,
            role: data.claims.role,
        })
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.as_ref().clone()
    }
}
