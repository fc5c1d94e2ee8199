//! Identity-provider session tokens (HS256 JWTs).
//!
//! The service never issues sessions itself; it only verifies the provider's token and reads
//! the user id (`sub`) and e-mail. `mint_token` exists for the operator CLI and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: Option<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email,
            role: Some("authenticated".to_string()),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error("Invalid JWT token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    // Provider tokens carry `aud: authenticated`; the secret is what binds them to us
    validation.validate_aud = false;
    validation
}

pub fn decode_token(token: &str, secret: Option<&str>) -> Result<Claims, JwtError> {
    let secret = secret.filter(|s| !s.is_empty()).ok_or(JwtError::MissingSecret)?;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation())?;
    Ok(data.claims)
}

pub fn mint_token(claims: &Claims, secret: Option<&str>) -> Result<String, JwtError> {
    let secret = secret.filter(|s| !s.is_empty()).ok_or(JwtError::MissingSecret)?;
    Ok(encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_identity() {
        let user = Uuid::new_v4();
        let claims = Claims::new(user, Some("writer@example.com".into()), Duration::hours(1));
        let token = mint_token(&claims, Some("s3cret")).unwrap();
        let decoded = decode_token(&token, Some("s3cret")).unwrap();
        assert_eq!(decoded.sub, user);
        assert_eq!(decoded.email.as_deref(), Some("writer@example.com"));
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let claims = Claims::new(Uuid::new_v4(), None, Duration::hours(1));
        let token = mint_token(&claims, Some("one")).unwrap();
        assert!(matches!(decode_token(&token, Some("two")), Err(JwtError::Invalid(_))));

        let expired = Claims::new(Uuid::new_v4(), None, Duration::hours(-2));
        let token = mint_token(&expired, Some("one")).unwrap();
        assert!(decode_token(&token, Some("one")).is_err());
    }

    #[test]
    fn missing_secret_fails_closed() {
        assert!(matches!(decode_token("a.b.c", None), Err(JwtError::MissingSecret)));
        assert!(matches!(decode_token("a.b.c", Some("")), Err(JwtError::MissingSecret)));
    }
}
