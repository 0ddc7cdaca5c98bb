use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use onboard_core::types::{User, UserRole};

/// Injected clock. Handlers and the pipeline never call `Utc::now`
/// directly so tests can pin time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub name: Option<String>,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Sign(String),
}

/// Issues and checks HS256 session tokens.
///
/// Expiry is validated manually against the injected clock rather than
/// the library's wall-clock check.
#[derive(Clone)]
pub struct SessionTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl SessionTokens {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_aud = false;
        validation.validate_exp = false;
        validation.validate_nbf = false;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_secs,
        }
    }

    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError> {
        let issued = now.timestamp().max(0) as usize;
        let claims = SessionClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            name: user.name.clone(),
            iat: issued,
            exp: issued + self.ttl_secs as usize,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| TokenError::Sign(format!("{err}")))
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<User, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| TokenError::Invalid(format!("{err}")))?;
        let claims = data.claims;
        if now.timestamp() >= claims.exp as i64 {
            return Err(TokenError::Expired);
        }
        let role = UserRole::parse(&claims.role)
            .ok_or_else(|| TokenError::Invalid("unknown_role".to_string()))?;
        Ok(User {
            id: claims.sub,
            email: claims.email,
            role,
            name: claims.name,
        })
    }
}
