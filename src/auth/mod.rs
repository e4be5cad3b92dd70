use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::ApiError;

/// Bearer token claims. `sub` is the principal's user id; the tenant is
/// always resolved from the users table, never trusted from the token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: i64) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            iat: now.timestamp(),
            exp,
        }
    }
}

/// Sign claims with the configured secret. Token issuance lives in the
/// account service; this exists so tooling and tests can mint tokens with
/// the same parameters the gateway verifies against.
pub fn sign(claims: &Claims) -> Result<String, ApiError> {
    sign_with_secret(claims, &config::config().security.jwt_secret)
}

/// Verify a bearer token against the configured secret.
pub fn verify(token: &str) -> Result<Claims, ApiError> {
    verify_with_secret(token, &config::config().security.jwt_secret)
}

pub fn sign_with_secret(claims: &Claims, secret: &str) -> Result<String, ApiError> {
    if secret.is_empty() {
        return Err(ApiError::Internal("JWT secret not configured".to_string()));
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| ApiError::Internal(format!("failed to sign token: {}", e)))
}

pub fn verify_with_secret(token: &str, secret: &str) -> Result<Claims, ApiError> {
    if secret.is_empty() {
        return Err(ApiError::Internal("JWT secret not configured".to_string()));
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    // Expiry decisions must be exact: an expired token tells the client to
    // sign in again, which is a different outcome than a malformed one.
    validation.leeway = 0;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
            Err(ApiError::CredentialExpired)
        }
        Err(_) => Err(ApiError::InvalidCredential),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn claims_with_exp(offset_secs: i64) -> Claims {
        let now = Utc::now();
        Claims {
            sub: 42,
            iat: (now - Duration::hours(1)).timestamp(),
            exp: (now + Duration::seconds(offset_secs)).timestamp(),
        }
    }

    #[test]
    fn valid_token_round_trips() {
        let token = sign_with_secret(&claims_with_exp(3600), SECRET).unwrap();
        let claims = verify_with_secret(&token, SECRET).unwrap();
        assert_eq!(claims.sub, 42);
    }

    #[test]
    fn recently_expired_token_is_expired_not_invalid() {
        let token = sign_with_secret(&claims_with_exp(-10), SECRET).unwrap();
        match verify_with_secret(&token, SECRET) {
            Err(ApiError::CredentialExpired) => {}
            other => panic!("expected CredentialExpired, got {:?}", other),
        }
    }

    #[test]
    fn garbage_token_is_invalid() {
        match verify_with_secret("not-a-token", SECRET) {
            Err(ApiError::InvalidCredential) => {}
            other => panic!("expected InvalidCredential, got {:?}", other),
        }
    }

    #[test]
    fn wrong_secret_is_invalid_not_expired() {
        let token = sign_with_secret(&claims_with_exp(3600), SECRET).unwrap();
        match verify_with_secret(&token, "other-secret") {
            Err(ApiError::InvalidCredential) => {}
            other => panic!("expected InvalidCredential, got {:?}", other),
        }
    }

    #[test]
    fn empty_secret_fails_closed() {
        assert!(matches!(
            verify_with_secret("anything", ""),
            Err(ApiError::Internal(_))
        ));
    }
}
