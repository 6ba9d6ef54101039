use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use std::sync::Arc;

use crate::config::Config;
use crate::models::StrengthStatus;
use crate::utils::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 8;

fn hash_with(params: Params, password: &[u8]) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password, &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {e}")))
}

/// Argon2id hashing with configurable cost. Hashing runs on the blocking
/// pool so request workers are not stalled.
#[derive(Clone)]
pub struct Passwords {
    params: Params,
    /// Verified against when no account matches, so a miss costs as much as
    /// a wrong password.
    dummy_hash: Arc<str>,
}

impl Passwords {
    pub fn new(memory_kib: u32, iterations: u32) -> AppResult<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| AppError::InternalServerError(format!("Invalid Argon2 params: {e}")))?;
        let dummy_hash = hash_with(params.clone(), b"no account has this password")?;
        Ok(Self {
            params,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(config.argon2_memory_kib, config.argon2_iterations)
    }

    pub async fn hash(&self, password: String) -> AppResult<String> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || hash_with(params, password.as_bytes()))
            .await
            .map_err(|e| AppError::InternalServerError(format!("Hashing task failed: {e}")))?
    }

    /// Cost parameters are read back from the stored hash.
    pub async fn verify(&self, password: String, hash: String) -> AppResult<bool> {
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash)
                .map_err(|e| AppError::InternalServerError(format!("Corrupt password hash: {e}")))?;
            Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|e| AppError::InternalServerError(format!("Hashing task failed: {e}")))?
    }

    /// Full verification against the dummy hash.
    pub async fn verify_dummy(&self, password: String) -> AppResult<bool> {
        self.verify(password, self.dummy_hash.to_string()).await
    }
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Coarse strength score: length plus character-class variety.
pub fn classify_strength(password: &str) -> (i32, StrengthStatus) {
    let length = password.chars().count().min(40) as i32;
    let classes = [
        password.chars().any(|c| c.is_lowercase()),
        password.chars().any(|c| c.is_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_alphanumeric()),
    ]
    .iter()
    .filter(|present| **present)
    .count() as i32;

    let mut score = length * 4 + classes * 10;
    if classes >= 3 && length >= 12 {
        score += 10;
    }

    let status = match score {
        s if s < 40 => StrengthStatus::VeryWeak,
        s if s < 80 => StrengthStatus::Weak,
        s if s < 120 => StrengthStatus::Average,
        s if s < 180 => StrengthStatus::Strong,
        _ => StrengthStatus::VeryStrong,
    };
    (score, status)
}
