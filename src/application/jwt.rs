use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::application::app_error::{AppError, AppResult};

/// Bearer-token claims for an authenticated site actor.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Entity id of the actor, as a string.
    pub sub: String,
    pub entity_type: String,
    /// Administrators may act on any entity's billing data.
    #[serde(default)]
    pub admin: bool,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn entity_id(&self) -> AppResult<i64> {
        self.sub.parse().map_err(|_| AppError::InvalidCredentials)
    }
}

pub fn issue(
    entity_type: &str,
    entity_id: i64,
    admin: bool,
    secret: &secrecy::SecretString,
    ttl: Duration,
) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: entity_id.to_string(),
        entity_type: entity_type.to_string(),
        admin,
        iat: now,
        exp: now + ttl.num_seconds(),
    };
    let header = Header::new(Algorithm::HS256);
    encode(
        &header,
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify(token: &str, secret: &secrecy::SecretString) -> AppResult<Claims> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> secrecy::SecretString {
        secrecy::SecretString::from("test-jwt-secret")
    }

    #[test]
    fn issues_and_verifies_a_token() {
        let token = issue("user", 42, false, &secret(), Duration::hours(1)).unwrap();
        let claims = verify(&token, &secret()).unwrap();
        assert_eq!(claims.entity_id().unwrap(), 42);
        assert_eq!(claims.entity_type, "user");
        assert!(!claims.admin);
    }

    #[test]
    fn rejects_a_token_signed_with_a_different_secret() {
        let token = issue("user", 42, false, &secret(), Duration::hours(1)).unwrap();
        let other = secrecy::SecretString::from("another-secret");
        assert!(verify(&token, &other).is_err());
    }

    #[test]
    fn rejects_an_expired_token() {
        let token = issue("user", 42, true, &secret(), Duration::hours(-2)).unwrap();
        assert!(verify(&token, &secret()).is_err());
    }
}
