//! JWT credential validation
//!
//! Access tokens are issued by the account service; the gateway only verifies
//! them (HS256, shared secret) and extracts the user ID from `sub`.

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use relay_core::{CollaboratorResult, CredentialValidator, DomainError, Snowflake};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;

/// Token type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims structure shared with the token issuer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub token_type: TokenType,
}

impl Claims {
    pub fn user_id(&self) -> Result<Snowflake, DomainError> {
        self.sub
            .parse()
            .map_err(|_| DomainError::InvalidCredential)
    }
}

/// Verifies bearer access tokens
#[derive(Clone)]
pub struct JwtCredentialValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCredentialValidator {
    #[must_use]
    pub fn new(secret: &str, leeway: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    #[must_use]
    pub fn from_config(config: &JwtConfig) -> Self {
        Self::new(&config.secret, config.leeway)
    }

    /// Decode a token, accepting an optional `Bearer ` prefix
    pub fn decode_claims(&self, token: &str) -> Result<Claims, DomainError> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => DomainError::CredentialExpired,
                _ => DomainError::InvalidCredential,
            }
        })?;

        if data.claims.token_type != TokenType::Access {
            return Err(DomainError::InvalidCredential);
        }

        Ok(data.claims)
    }
}

#[async_trait]
impl CredentialValidator for JwtCredentialValidator {
    async fn validate_credential(&self, token: &str) -> CollaboratorResult<Snowflake> {
        let claims = self.decode_claims(token).map_err(|e| {
            tracing::debug!(error = %e, "Credential rejected");
            e
        })?;
        claims.user_id()
    }
}

impl std::fmt::Debug for JwtCredentialValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtCredentialValidator")
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-key-that-is-long-enough";

    fn token(sub: &str, token_type: TokenType, ttl_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now,
            exp: now + ttl_secs,
            token_type,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_valid_access_token() {
        let validator = JwtCredentialValidator::new(SECRET, 0);
        let user_id = validator
            .validate_credential(&token("12345", TokenType::Access, 900))
            .await
            .unwrap();
        assert_eq!(user_id, Snowflake::new(12345));
    }

    #[tokio::test]
    async fn test_bearer_prefix_is_accepted() {
        let validator = JwtCredentialValidator::new(SECRET, 0);
        let raw = format!("Bearer {}", token("7", TokenType::Access, 900));
        assert_eq!(
            validator.validate_credential(&raw).await.unwrap(),
            Snowflake::new(7)
        );
    }

    #[tokio::test]
    async fn test_refresh_token_is_rejected() {
        let validator = JwtCredentialValidator::new(SECRET, 0);
        let err = validator
            .validate_credential(&token("12345", TokenType::Refresh, 900))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCredential));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let validator = JwtCredentialValidator::new(SECRET, 0);
        let err = validator
            .validate_credential(&token("12345", TokenType::Access, -120))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CredentialExpired));
    }

    #[tokio::test]
    async fn test_wrong_secret_and_garbage() {
        let validator = JwtCredentialValidator::new("another-secret", 0);
        let err = validator
            .validate_credential(&token("12345", TokenType::Access, 900))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCredential));

        let err = validator
            .validate_credential("invalid.token.here")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCredential));
    }

    #[tokio::test]
    async fn test_non_numeric_subject() {
        let validator = JwtCredentialValidator::new(SECRET, 0);
        let err = validator
            .validate_credential(&token("alice", TokenType::Access, 900))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCredential));
    }
}
