//! Stateless session credentials.
//!
//! A session is a signed, time-limited assertion of the wallet-derived user
//! id. Nothing is persisted server-side; expiry comes from the `exp` claim.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use zapgate_core::types::UserId;
use zapgate_core::{Error, Result};

use crate::config::SessionConfig;

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject — the wallet-derived user id.
    pub sub: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Signing and verification keys for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(config: &SessionConfig) -> Self {
        SessionKeys {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: config.ttl,
        }
    }

    /// Sign a fresh session token for `user_id`.
    pub fn issue(&self, user_id: &UserId) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(Error::database)
    }

    /// Verify a token and extract the user id. Any malformed, tampered, or
    /// expired token maps to [`Error::SessionInvalid`].
    pub fn verify(&self, token: &str) -> Result<UserId> {
        let data =
            jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &Validation::default())
                .map_err(|_| Error::SessionInvalid)?;
        Ok(UserId::from(data.claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ttl: Duration) -> SessionKeys {
        SessionKeys::new(&SessionConfig::builder().secret("test-secret").ttl(ttl).build())
    }

    #[test]
    fn issue_then_verify_round_trips() {
        let keys = keys(Duration::hours(1));
        let token = keys.issue(&UserId::from("wallet-key")).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), UserId::from("wallet-key"));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let keys = keys(Duration::hours(1));
        let mut token = keys.issue(&UserId::from("wallet-key")).unwrap();
        token.push('x');
        assert!(matches!(keys.verify(&token), Err(Error::SessionInvalid)));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = keys(Duration::hours(1))
            .issue(&UserId::from("wallet-key"))
            .unwrap();
        let other =
            SessionKeys::new(&SessionConfig::builder().secret("other-secret").build());
        assert!(matches!(other.verify(&token), Err(Error::SessionInvalid)));
    }

    #[test]
    fn expired_token_is_rejected() {
        // Well past the default validation leeway.
        let keys = keys(Duration::minutes(-5));
        let token = keys.issue(&UserId::from("wallet-key")).unwrap();
        assert!(matches!(keys.verify(&token), Err(Error::SessionInvalid)));
    }
}
