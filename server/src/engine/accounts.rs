use chrono::Utc;
use constant_time_eq::constant_time_eq;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::{load_concert, load_user, Marketplace};
use crate::auth::password::validate_password;
use crate::auth::{classify_strength, Principal};
use crate::models::{User, UserProfile, Wallet};
use crate::store::{Store, StoreTx};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct SignupInput {
    pub username: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaffLoginInput {
    pub concert_id: Uuid,
    pub access_key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(AppError::ValidationError(format!(
            "'{email}' is not a valid email address"
        )));
    }
    Ok(email)
}

fn invalid_credentials() -> AppError {
    AppError::AuthError("Invalid email or password".to_string())
}

impl<S: Store> Marketplace<S> {
    /// Registers a user together with an empty wallet and returns a session
    /// token.
    pub async fn signup(&self, input: SignupInput) -> AppResult<String> {
        let email = normalize_email(&input.email)?;
        validate_password(&input.password)?;
        let username = input
            .username
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        let (password_score, password_strength) = classify_strength(&input.password);
        let password_hash = self.passwords.hash(input.password).await?;

        let mut tx = self.store.begin().await?;
        if tx.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let wallet = Wallet::empty();
        tx.insert_wallet(&wallet).await?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            password_score,
            password_strength,
            wallet_id: wallet.id,
            created_at: now,
            updated_at: now,
        };
        tx.insert_user(&user).await?;
        tx.commit().await?;

        info!(user_id = %user.id, wallet_id = %wallet.id, "User signed up");
        self.tokens.issue(Principal::User { user_id: user.id })
    }

    pub async fn login(&self, input: LoginInput) -> AppResult<String> {
        let email = input.email.trim().to_lowercase();
        let user = {
            let mut tx = self.store.begin().await?;
            let found = tx.find_user_by_email(&email).await?;
            found
        };

        let Some(user) = user else {
            self.passwords.verify_dummy(input.password).await?;
            warn!("Login attempt for unknown email");
            return Err(invalid_credentials());
        };

        if !self
            .passwords
            .verify(input.password, user.password_hash.clone())
            .await?
        {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(invalid_credentials());
        }

        self.tokens.issue(Principal::User { user_id: user.id })
    }

    /// Issues a staff token bound to one concert.
    pub async fn staff_login(&self, input: StaffLoginInput) -> AppResult<String> {
        if !constant_time_eq(input.access_key.as_bytes(), self.staff_access_key.as_bytes()) {
            warn!(concert_id = %input.concert_id, "Staff login with wrong access key");
            return Err(AppError::AuthError("Invalid staff access key".to_string()));
        }

        let concert = {
            let mut tx = self.store.begin().await?;
            let concert = load_concert(&mut tx, input.concert_id).await?;
            concert
        };

        info!(concert_id = %concert.id, "Staff logged in");
        self.tokens.issue(Principal::Staff {
            concert_id: concert.id,
        })
    }

    pub async fn update_user(&self, user_id: Uuid, input: UpdateUserInput) -> AppResult<UserProfile> {
        if input.email.is_none() && input.password.is_none() {
            return Err(AppError::ValidationError(
                "Nothing to update: provide an email or a password".to_string(),
            ));
        }

        let email = input.email.as_deref().map(normalize_email).transpose()?;
        let password = match input.password {
            Some(password) => {
                validate_password(&password)?;
                let strength = classify_strength(&password);
                Some((self.passwords.hash(password).await?, strength))
            }
            None => None,
        };

        let mut tx = self.store.begin().await?;
        let mut user = load_user(&mut tx, user_id).await?;
        if let Some(email) = email {
            user.email = email;
        }
        if let Some((hash, (score, status))) = password {
            user.password_hash = hash;
            user.password_score = score;
            user.password_strength = status;
        }
        user.updated_at = Utc::now();

        tx.update_user(&user).await?;
        let profile = self.profile_in(&mut tx, user).await?;
        tx.commit().await?;

        info!(user_id = %user_id, "User updated");
        Ok(profile)
    }
}
