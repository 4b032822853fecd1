use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::Role;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl AuthConfig {
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.jwt_secret.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

pub fn issue_token(
    user_id: Uuid,
    email: &str,
    role: Role,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::hours(config.token_ttl_hours))
        .unwrap_or(now)
        .timestamp()
        .max(0) as usize;
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
}

pub fn decode_token(token: &str, config: &AuthConfig) -> jsonwebtoken::errors::Result<Claims> {
    jsonwebtoken::decode::<Claims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl: i64) -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: ttl,
        }
    }

    #[test]
    fn test_issued_token_decodes_with_same_secret() {
        let id = Uuid::new_v4();
        let token = issue_token(id, "hr@example.com", Role::Hr, &config(24)).unwrap();
        let claims = decode_token(&token, &config(24)).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "hr@example.com");
        assert_eq!(claims.role, Role::Hr);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejected_with_other_secret() {
        let token = issue_token(Uuid::new_v4(), "a@b.io", Role::Employee, &config(24)).unwrap();
        let other = AuthConfig {
            jwt_secret: "another-secret".to_string(),
            token_ttl_hours: 24,
        };
        assert!(decode_token(&token, &other).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token(Uuid::new_v4(), "a@b.io", Role::Candidate, &config(-2)).unwrap();
        assert!(decode_token(&token, &config(-2)).is_err());
    }

    #[test]
    fn test_role_serialized_as_display_name() {
        let token = issue_token(Uuid::new_v4(), "a@b.io", Role::Hr, &config(1)).unwrap();
        let claims = decode_token(&token, &config(1)).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["role"], "HR");
    }
}
