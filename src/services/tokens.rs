//! Session token issuing and verification

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
};

/// Claims carried by a session token. Only the subject identifies the user;
/// role and profile are always re-read from the credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Invalid token")]
    Invalid,
    #[error("Expired token")]
    Expired,
}

/// Fixed session lifetime; not configurable
pub const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Issue a token for `user_id`, valid from now
    pub fn issue(&self, user_id: Uuid) -> AppResult<String> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token whose validity window starts at `issued_at`
    pub fn issue_at(&self, user_id: Uuid, issued_at: DateTime<Utc>) -> AppResult<String> {
        let claims = SessionClaims {
            sub: Some(user_id.to_string()),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Check signature and expiry, then return the embedded subject
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            },
        )?;

        data.claims
            .sub
            .as_deref()
            .and_then(|sub| Uuid::parse_str(sub).ok())
            .ok_or(TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: secret.to_string(),
        })
    }

    #[test]
    fn test_issue_then_verify_returns_subject() {
        let tokens = service("secret");
        let user_id = Uuid::new_v4();
        let token = tokens.issue(user_id).unwrap();
        assert_eq!(tokens.verify(&token), Ok(user_id));
    }

    #[test]
    fn test_token_lasts_seven_days() {
        let tokens = service("secret");
        let user_id = Uuid::new_v4();

        let almost = tokens
            .issue_at(user_id, Utc::now() - Duration::days(6) - Duration::hours(23))
            .unwrap();
        assert_eq!(tokens.verify(&almost), Ok(user_id));

        let stale = tokens
            .issue_at(user_id, Utc::now() - Duration::days(7) - Duration::minutes(1))
            .unwrap();
        assert_eq!(tokens.verify(&stale), Err(TokenError::Expired));
    }

    #[test]
    fn test_eight_day_old_token_is_expired() {
        let tokens = service("secret");
        let token = tokens
            .issue_at(Uuid::new_v4(), Utc::now() - Duration::days(8))
            .unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_foreign_signature_is_invalid() {
        let token = service("other-secret").issue(Uuid::new_v4()).unwrap();
        assert_eq!(service("secret").verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert_eq!(service("secret").verify("not.a.token"), Err(TokenError::Invalid));
    }

    #[test]
    fn test_missing_subject_is_invalid() {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: None,
            iat: now.timestamp(),
            exp: (now + Duration::days(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(service("secret").verify(&token), Err(TokenError::Invalid));
    }
}
