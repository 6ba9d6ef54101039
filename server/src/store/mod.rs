//! Persistence boundary.
//!
//! Every read and write goes through a [`StoreTx`] obtained from
//! [`Store::begin`]. A transaction that is dropped without [`StoreTx::commit`]
//! leaves the store untouched, so a failed purchase never leaves wallets and
//! tickets half-updated.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    Artist, Concert, Ticket, TicketFilter, TicketGroupRow, Transaction, User, Wallet,
};
use crate::utils::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub trait Store: Clone + Send + Sync + 'static {
    type Tx: StoreTx;

    fn begin(&self) -> impl Future<Output = AppResult<Self::Tx>> + Send;
}

/// One unit of work against the store.
///
/// Methods named `lock_*` or `claim_*` hold the returned rows until the
/// transaction ends; concurrent transactions touching the same rows wait or
/// skip them.
pub trait StoreTx: Send {
    fn commit(self) -> impl Future<Output = AppResult<()>> + Send;

    // Users and wallets

    fn insert_wallet(&mut self, wallet: &Wallet) -> impl Future<Output = AppResult<()>> + Send;

    fn find_wallet(&mut self, id: Uuid) -> impl Future<Output = AppResult<Option<Wallet>>> + Send;

    /// Adds `delta` to the wallet balance and returns the updated wallet.
    /// Fails with a validation error when the balance would leave the
    /// storable range.
    fn increment_wallet(
        &mut self,
        id: Uuid,
        delta: Decimal,
    ) -> impl Future<Output = AppResult<Option<Wallet>>> + Send;

    /// Fails with a conflict when the email is already registered.
    fn insert_user(&mut self, user: &User) -> impl Future<Output = AppResult<()>> + Send;

    fn find_user(&mut self, id: Uuid) -> impl Future<Output = AppResult<Option<User>>> + Send;

    fn find_user_by_email(
        &mut self,
        email: &str,
    ) -> impl Future<Output = AppResult<Option<User>>> + Send;

    fn list_users(&mut self) -> impl Future<Output = AppResult<Vec<User>>> + Send;

    /// Fails with a conflict when the email belongs to another user.
    fn update_user(&mut self, user: &User) -> impl Future<Output = AppResult<()>> + Send;

    // Catalog

    fn insert_artist(&mut self, artist: &Artist) -> impl Future<Output = AppResult<()>> + Send;

    fn find_artist(&mut self, id: Uuid) -> impl Future<Output = AppResult<Option<Artist>>> + Send;

    fn list_artists(&mut self) -> impl Future<Output = AppResult<Vec<Artist>>> + Send;

    fn insert_concert(&mut self, concert: &Concert) -> impl Future<Output = AppResult<()>> + Send;

    fn find_concert(&mut self, id: Uuid)
        -> impl Future<Output = AppResult<Option<Concert>>> + Send;

    /// Like `find_concert`, but serializes ticket creation for the concert.
    fn lock_concert(&mut self, id: Uuid)
        -> impl Future<Output = AppResult<Option<Concert>>> + Send;

    fn list_concerts(&mut self) -> impl Future<Output = AppResult<Vec<Concert>>> + Send;

    // Tickets

    fn insert_tickets(&mut self, tickets: &[Ticket]) -> impl Future<Output = AppResult<()>> + Send;

    fn find_ticket(&mut self, id: Uuid) -> impl Future<Output = AppResult<Option<Ticket>>> + Send;

    fn lock_ticket(&mut self, id: Uuid) -> impl Future<Output = AppResult<Option<Ticket>>> + Send;

    /// Ordered by `created_at`, then id.
    fn list_tickets(
        &mut self,
        filter: &TicketFilter,
    ) -> impl Future<Output = AppResult<Vec<Ticket>>> + Send;

    fn count_tickets(&mut self, concert_id: Uuid) -> impl Future<Output = AppResult<i64>> + Send;

    /// Locks up to `limit` available tickets of one (concert, seller, price)
    /// pool, oldest first. Rows already locked by another transaction are
    /// skipped.
    fn claim_available(
        &mut self,
        concert_id: Uuid,
        seller_id: Uuid,
        price: Decimal,
        limit: i64,
    ) -> impl Future<Output = AppResult<Vec<Ticket>>> + Send;

    /// `available -> sold`. Returns `false` when the ticket was not available.
    fn mark_sold(
        &mut self,
        ticket_id: Uuid,
        buyer_id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = AppResult<bool>> + Send;

    /// `sold -> redeemed`. Returns `None` when the ticket was not sold.
    fn mark_redeemed(
        &mut self,
        ticket_id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = AppResult<Option<Ticket>>> + Send;

    /// Available tickets grouped by concert, seller, price and kind.
    fn group_available(
        &mut self,
        concert_id: Option<Uuid>,
    ) -> impl Future<Output = AppResult<Vec<TicketGroupRow>>> + Send;

    // Transactions

    fn insert_transaction(
        &mut self,
        transaction: &Transaction,
    ) -> impl Future<Output = AppResult<()>> + Send;

    fn find_transaction(
        &mut self,
        id: Uuid,
    ) -> impl Future<Output = AppResult<Option<Transaction>>> + Send;

    /// Transactions where the user is payer or receiver, newest first.
    fn list_transactions_for(
        &mut self,
        user_id: Uuid,
    ) -> impl Future<Output = AppResult<Vec<Transaction>>> + Send;

    fn count_transactions(&mut self) -> impl Future<Output = AppResult<i64>> + Send;
}
