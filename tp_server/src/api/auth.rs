//! Identity token verification.
//!
//! Accounts and logins live in an external identity service. It signs
//! short-lived HS256 JWTs with a secret shared with this server; every
//! protected REST call and WebSocket upgrade presents one.
//!
//! # Claims
//!
//! ```json
//! { "sub": 42, "username": "asha", "avatar": "/media/a.png", "exp": 1767225600 }
//! ```

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use teen_patti::room::Identity;
use thiserror::Error;

/// Claims carried by an identity token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Expiry as seconds since the Unix epoch
    pub exp: u64,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.sub,
            username: self.username.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Token verification errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),

    /// Ids at or below zero belong to bots
    #[error("Token subject {0} is not a player account")]
    InvalidSubject(i64),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::Invalid(err),
        }
    }
}

/// Verifies (and, for tooling, issues) HS256 identity tokens
pub struct TokenVerifier {
    decoding: DecodingKey,
    encoding: EncodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Check signature and expiry, returning the token's claims
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)?.claims;
        if claims.sub <= 0 {
            return Err(AuthError::InvalidSubject(claims.sub));
        }
        Ok(claims)
    }

    /// Sign a token the way the identity service does. Used by tests and
    /// local tooling.
    pub fn issue(
        &self,
        user_id: i64,
        username: &str,
        avatar: Option<&str>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            avatar: avatar.map(str::to_string),
            exp: (now + ttl).as_secs(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_for_testing_only_0123456789";

    #[test]
    fn test_issued_token_verifies() {
        let verifier = TokenVerifier::new(SECRET);
        let token = verifier
            .issue(7, "asha", Some("/media/a.png"), Duration::from_secs(600))
            .unwrap();

        let claims = verifier.verify(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert_eq!(
            claims.identity(),
            Identity {
                user_id: 7,
                username: "asha".to_string(),
                avatar: Some("/media/a.png".to_string()),
            }
        );
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenVerifier::new(SECRET)
            .issue(7, "asha", None, Duration::from_secs(600))
            .unwrap();
        let other = TokenVerifier::new("another_secret_key_that_is_long_enough_xx");

        assert!(matches!(other.verify(&token), Err(AuthError::Invalid(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        let claims = Claims {
            sub: 7,
            username: "asha".to_string(),
            avatar: None,
            exp: 1_000,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(verifier.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn test_bot_subject_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        let token = verifier
            .issue(-3, "Bot_3", None, Duration::from_secs(600))
            .unwrap();

        assert!(matches!(
            verifier.verify(&token),
            Err(AuthError::InvalidSubject(-3))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let verifier = TokenVerifier::new(SECRET);
        assert!(verifier.verify("not.a.jwt").is_err());
    }
}
