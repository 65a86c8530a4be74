pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;
use crate::models::AuthorizationToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
}

#[derive(Debug)]
pub enum AuthError {
    /// Malformed, expired, not yet valid or badly signed
    InvalidToken(String),
    /// Token is valid but was issued to someone other than the presenter
    OwnershipMismatch,
    TokenGeneration(String),
    InvalidSecret,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidToken(_) => write!(f, "Invalid token presented."),
            AuthError::OwnershipMismatch => write!(f, "Cannot verify ownership of token."),
            AuthError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            AuthError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Issues and verifies the bearer tokens handed out at authentication
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
    not_before: Duration,
    leeway_secs: u64,
}

impl TokenAuthority {
    pub fn new(secret: &str, lifetime: Duration, not_before: Duration, leeway_secs: u64) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
            not_before,
            leeway_secs,
        })
    }

    pub fn from_config(security: &SecurityConfig) -> Result<Self, AuthError> {
        Self::new(
            &security.jwt_secret,
            Duration::hours(security.jwt_expiry_hours as i64),
            Duration::seconds(security.jwt_not_before_secs as i64),
            security.jwt_leeway_secs,
        )
    }

    pub fn claims_for(&self, username: &str) -> Claims {
        let now = Utc::now();
        Claims {
            username: username.to_string(),
            exp: (now + self.lifetime).timestamp(),
            nbf: (now + self.not_before).timestamp(),
            iat: now.timestamp(),
        }
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Mint a token for `username` and pair it with that name as presenter
    pub fn issue(&self, username: &str) -> Result<AuthorizationToken, AuthError> {
        let token = self.encode(&self.claims_for(username))?;
        Ok(AuthorizationToken {
            token,
            presenter: username.to_string(),
        })
    }

    /// Check signature, `exp` and `nbf`, then require the subject to match the presenter
    pub fn verify(&self, authorization: &AuthorizationToken) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "nbf"]);
        validation.validate_nbf = true;
        validation.leeway = self.leeway_secs;

        let token_data = decode::<Claims>(&authorization.token, &self.decoding_key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if token_data.claims.username != authorization.presenter {
            return Err(AuthError::OwnershipMismatch);
        }

        Ok(token_data.claims)
    }
}
