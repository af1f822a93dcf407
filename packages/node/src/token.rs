//! Bearer token encoding and decoding.
//!
//! Tokens are HS256 JWTs whose claims carry the user's email. Only the email
//! is trusted; the user record itself is always looked up fresh.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Default lifetime of issued tokens.
pub const DEFAULT_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Issues and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::days(DEFAULT_TTL_DAYS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Issue a token for `email`.
    pub fn encode(&self, email: &str, user_id: Option<&str>) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = TokenClaims {
            email: email.to_string(),
            user_id: user_id.map(str::to_string),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Verify `token` and return its claims. Expired or tampered tokens fail.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        Ok(decode::<TokenClaims>(token, &self.decoding, &self.validation)?.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_decodes() {
        let codec = TokenCodec::new(b"secret");
        let token = codec.encode("ada@example.com", Some("u1")).unwrap();
        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.user_id.as_deref(), Some("u1"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = TokenCodec::new(b"one").encode("ada@example.com", None).unwrap();
        assert!(TokenCodec::new(b"two").decode(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = TokenCodec::new(b"secret").with_ttl(Duration::hours(-2));
        let token = codec.encode("ada@example.com", None).unwrap();
        assert!(codec.decode(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(TokenCodec::new(b"secret").decode("not-a-jwt").is_err());
    }
}
