//! # Bearer Tokens
//!
//! HS256 tokens carrying the caller's email. Tokens carry no `exp` claim;
//! they stay valid for as long as the signing secret does.

use crate::error::{MarketError, MarketResult};
use crate::user::UserDirectory;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Identity claim embedded in every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    /// Issued-at (unix seconds)
    pub iat: i64,
}

/// Why a presented token was not accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenRejection {
    /// Malformed, unsigned, tampered, or signed with another key
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Issues and verifies bearer tokens
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a token for a registered user; refuses unknown emails.
    pub async fn issue(&self, users: &UserDirectory, email: &str) -> MarketResult<String> {
        if users.find_by_email(email).await?.is_none() {
            warn!(email, "token requested for unknown user");
            return Err(MarketError::Forbidden(
                "no user registered with this email".to_string(),
            ));
        }
        self.sign(email)
    }

    /// Sign a token without consulting the identity store
    pub fn sign(&self, email: &str) -> MarketResult<String> {
        let claims = Claims {
            email: email.to_string(),
            iat: chrono::Utc::now().timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| MarketError::Token(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenRejection> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!("token rejected: {}", e);
            TokenRejection::Invalid(e.to_string())
        })?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::SharedStore;
    use crate::user::{Registration, Role};
    use std::sync::Arc;

    #[test]
    fn test_sign_then_verify() {
        let tokens = TokenService::new("secret-a");
        let token = tokens.sign("ann@cars.io").unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.email, "ann@cars.io");
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = TokenService::new("secret-a").sign("ann@cars.io").unwrap();
        let result = TokenService::new("secret-b").verify(&token);
        assert!(matches!(result, Err(TokenRejection::Invalid(_))));
    }

    #[test]
    fn test_garbage_and_tampered_rejected() {
        let tokens = TokenService::new("secret-a");
        assert!(tokens.verify("not-a-token").is_err());
        assert!(tokens.verify("").is_err());

        let token = tokens.sign("ann@cars.io").unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = TokenService::new("x").sign("mallory@cars.io").unwrap();
        let forged: Vec<&str> = forged_payload.split('.').collect();
        parts[1] = forged[1];
        assert!(tokens.verify(&parts.join(".")).is_err());
    }

    #[tokio::test]
    async fn test_issue_requires_registered_user() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let users = UserDirectory::new(store);
        let tokens = TokenService::new("secret");

        let refused = tokens.issue(&users, "ghost@cars.io").await.unwrap_err();
        assert_eq!(refused.status_code(), 403);

        users
            .register(Registration::new("ann@cars.io", "Ann", Role::Buyer))
            .await
            .unwrap();
        let token = tokens.issue(&users, "ann@cars.io").await.unwrap();
        assert_eq!(tokens.verify(&token).unwrap().email, "ann@cars.io");
    }
}
