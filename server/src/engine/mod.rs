//! Marketplace operations.
//!
//! [`Marketplace`] owns the store handle and the collaborators every
//! operation needs. Each mutating operation runs inside exactly one store
//! transaction and commits only after every step has succeeded.

use uuid::Uuid;

use crate::auth::{Passwords, TokenIssuer};
use crate::config::Config;
use crate::models::{Concert, Ticket, User};
use crate::store::{Store, StoreTx};
use crate::utils::{AppError, AppResult};

pub mod accounts;
pub mod catalog;
pub mod ledger;
pub mod purchase;
pub mod queries;
pub mod redemption;

pub use accounts::{LoginInput, SignupInput, StaffLoginInput, UpdateUserInput};
pub use catalog::{CreateArtist, CreateConcert, CreateTicket, CreateTickets};
pub use ledger::{DepositInput, Ledger};
pub use purchase::BulkPurchase;

pub struct Marketplace<S: Store> {
    store: S,
    tokens: TokenIssuer,
    passwords: Passwords,
    ledger: Ledger,
    staff_access_key: String,
}

impl<S: Store> Marketplace<S> {
    pub fn new(store: S, config: &Config) -> AppResult<Self> {
        Ok(Self {
            store,
            tokens: TokenIssuer::from_config(config),
            passwords: Passwords::from_config(config)?,
            ledger: Ledger::new(config.allow_overdraft),
            staff_access_key: config.staff_access_key.clone(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }
}

pub(crate) fn not_found(kind: &str, id: Uuid) -> AppError {
    AppError::NotFound(format!("{kind} '{id}' not found"))
}

pub(crate) async fn load_user<T: StoreTx>(tx: &mut T, id: Uuid) -> AppResult<User> {
    tx.find_user(id).await?.ok_or_else(|| not_found("User", id))
}

pub(crate) async fn load_concert<T: StoreTx>(tx: &mut T, id: Uuid) -> AppResult<Concert> {
    tx.find_concert(id).await?.ok_or_else(|| not_found("Concert", id))
}

pub(crate) async fn load_ticket<T: StoreTx>(tx: &mut T, id: Uuid) -> AppResult<Ticket> {
    tx.find_ticket(id).await?.ok_or_else(|| not_found("Ticket", id))
}

pub(crate) fn require_text(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
