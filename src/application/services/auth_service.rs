//! Authentication Service
//!
//! Verifies the optional bearer token carried by the gateway
//! `authenticate` event. Token issuing is owned by an external identity
//! provider; this service only checks signature, expiry and subject.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::shared::error::GatewayError;

/// Token verification trait for dependency injection
pub trait AuthService: Send + Sync {
    /// Whether `authenticate` must carry a token.
    fn requires_token(&self) -> bool;

    /// Check that `token` proves the caller is `user_id`.
    fn verify_identity(&self, user_id: i64, token: Option<&str>) -> Result<(), AuthError>;
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

/// Authentication errors
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Token required")]
    MissingToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token subject does not match user")]
    SubjectMismatch,
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        GatewayError::InvalidToken(err.to_string())
    }
}

/// HS256 verifier. Without a secret every identity is accepted.
pub struct AuthServiceImpl {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl AuthServiceImpl {
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            key: secret.map(|s| DecodingKey::from_secret(s.as_bytes())),
            validation: Validation::default(),
        }
    }

    fn decode_claims(&self, key: &DecodingKey, token: &str) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(token, key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        Ok(token_data.claims)
    }
}

impl AuthService for AuthServiceImpl {
    fn requires_token(&self) -> bool {
        self.key.is_some()
    }

    fn verify_identity(&self, user_id: i64, token: Option<&str>) -> Result<(), AuthError> {
        let Some(key) = &self.key else {
            return Ok(());
        };
        let token = token.ok_or(AuthError::MissingToken)?;
        let claims = self.decode_claims(key, token)?;

        match claims.sub.parse::<i64>() {
            Ok(sub) if sub == user_id => Ok(()),
            Ok(_) => Err(AuthError::SubjectMismatch),
            Err(_) => Err(AuthError::InvalidToken),
        }
    }
}
