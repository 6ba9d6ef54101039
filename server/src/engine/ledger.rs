use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{load_user, not_found, Marketplace};
use crate::models::Wallet;
use crate::store::{Store, StoreTx};
use crate::utils::{AppError, AppResult};

/// Wallet balances, prices and amounts are stored as `NUMERIC(18,2)`.
pub const MONEY_SCALE: u32 = 2;

/// Exclusive bound on the magnitude of any stored amount.
fn money_limit() -> Decimal {
    Decimal::from(10_000_000_000_000_000_i64)
}

/// Accepts an amount only if it is stored exactly: at most two decimal
/// places and within the column's range.
pub fn validate_money(field: &str, value: Decimal) -> AppResult<Decimal> {
    let value = value.normalize();
    if value.scale() > MONEY_SCALE {
        return Err(AppError::ValidationError(format!(
            "{field} can have at most {MONEY_SCALE} decimal places"
        )));
    }
    if value.abs() >= money_limit() {
        return Err(AppError::ValidationError(format!("{field} is out of range")));
    }
    Ok(value)
}

fn balance_out_of_range() -> AppError {
    AppError::ValidationError("Wallet balance would be out of range".to_string())
}

/// Wallet balance rules. Balances only ever move by increments, inside the
/// caller's store transaction.
#[derive(Debug, Clone, Copy)]
pub struct Ledger {
    allow_overdraft: bool,
}

impl Ledger {
    pub fn new(allow_overdraft: bool) -> Self {
        Self { allow_overdraft }
    }

    /// Applies `delta` to a wallet. A debit that leaves the balance negative
    /// fails unless overdraft is allowed; the caller's transaction must then
    /// be discarded.
    pub async fn adjust<T: StoreTx>(
        &self,
        tx: &mut T,
        wallet_id: Uuid,
        delta: Decimal,
    ) -> AppResult<Wallet> {
        let wallet = tx
            .increment_wallet(wallet_id, delta)
            .await?
            .ok_or_else(|| not_found("Wallet", wallet_id))?;

        if wallet.balance.abs() >= money_limit() {
            return Err(balance_out_of_range());
        }
        if delta < Decimal::ZERO && wallet.balance < Decimal::ZERO && !self.allow_overdraft {
            return Err(AppError::InsufficientFunds(format!(
                "Debit of {} would leave a balance of {}",
                -delta,
                wallet.balance
            )));
        }
        Ok(wallet)
    }

    /// Moves `amount` from one wallet to another. Wallets are touched in id
    /// order so opposite transfers running concurrently lock rows in the same
    /// sequence.
    pub async fn transfer<T: StoreTx>(
        &self,
        tx: &mut T,
        from_wallet: Uuid,
        to_wallet: Uuid,
        amount: Decimal,
    ) -> AppResult<()> {
        if amount < Decimal::ZERO {
            return Err(AppError::ValidationError(
                "Transfer amount cannot be negative".to_string(),
            ));
        }
        if from_wallet == to_wallet {
            return Err(AppError::ValidationError(
                "Cannot transfer to the same wallet".to_string(),
            ));
        }

        let mut legs = [(from_wallet, -amount), (to_wallet, amount)];
        legs.sort_by_key(|(wallet_id, _)| *wallet_id);
        for (wallet_id, delta) in legs {
            self.adjust(tx, wallet_id, delta).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositInput {
    /// Negative amounts withdraw.
    pub amount: Decimal,
}

impl<S: Store> Marketplace<S> {
    pub async fn deposit(&self, user_id: Uuid, input: DepositInput) -> AppResult<Wallet> {
        let amount = validate_money("amount", input.amount)?;
        if amount.is_zero() {
            return Err(AppError::ValidationError(
                "Deposit amount must not be zero".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let user = load_user(&mut tx, user_id).await?;
        let wallet = self.ledger.adjust(&mut tx, user.wallet_id, amount).await?;
        tx.commit().await?;

        info!(
            user_id = %user_id,
            wallet_id = %wallet.id,
            amount = %amount,
            balance = %wallet.balance,
            "Wallet adjusted"
        );
        Ok(wallet)
    }
}
