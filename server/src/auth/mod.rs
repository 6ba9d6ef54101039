use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::utils::{AppError, AppResult};

pub mod middleware;
pub mod password;

pub use middleware::AuthUser;
pub use password::{classify_strength, Passwords};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Staff,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id for `Role::User`, concert id for `Role::Staff`.
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

/// Identity carried by a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    User { user_id: Uuid },
    Staff { concert_id: Uuid },
}

impl Principal {
    pub fn user_id(&self) -> AppResult<Uuid> {
        match self {
            Principal::User { user_id } => Ok(*user_id),
            Principal::Staff { .. } => Err(AppError::Forbidden(
                "Staff credentials cannot perform user operations".to_string(),
            )),
        }
    }

    fn role(&self) -> Role {
        match self {
            Principal::User { .. } => Role::User,
            Principal::Staff { .. } => Role::Staff,
        }
    }

    fn subject(&self) -> Uuid {
        match self {
            Principal::User { user_id } => *user_id,
            Principal::Staff { concert_id } => *concert_id,
        }
    }
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Signs and verifies HS256 session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<Keys>,
    ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            ttl_secs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.jwt_secret, config.token_ttl_secs)
    }

    pub fn issue(&self, principal: Principal) -> AppResult<String> {
        let now = Utc::now();
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);
        let exp = now
            .checked_add_signed(Duration::seconds(ttl))
            .ok_or_else(|| AppError::InternalServerError("Token expiry overflow".to_string()))?;

        let claims = Claims {
            sub: principal.subject().to_string(),
            role: principal.role(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.keys.encoding)
            .map_err(|e| AppError::InternalServerError(format!("Token creation error: {e}")))
    }

    pub fn verify(&self, token: &str) -> AppResult<Principal> {
        let claims = decode::<Claims>(token, &self.keys.decoding, &Validation::default())?.claims;
        let subject = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        Ok(match claims.role {
            Role::User => Principal::User { user_id: subject },
            Role::Staff => Principal::Staff {
                concert_id: subject,
            },
        })
    }
}
