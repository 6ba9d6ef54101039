//! In-process store used for local development (`STORE_BACKEND=memory`) and
//! tests.
//!
//! A transaction holds the store mutex for its whole lifetime and works on a
//! staged copy of the tables, so transactions are fully serialized and a
//! dropped transaction discards its writes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, StoreTx};
use crate::models::{
    Artist, Concert, Ticket, TicketFilter, TicketGroupRow, TicketStatus, Transaction, User,
    Wallet,
};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct Tables {
    wallets: HashMap<Uuid, Wallet>,
    users: HashMap<Uuid, User>,
    artists: HashMap<Uuid, Artist>,
    concerts: HashMap<Uuid, Concert>,
    tickets: HashMap<Uuid, Ticket>,
    transactions: Vec<Transaction>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != except)
    }

    fn sorted_tickets(&self, filter: &TicketFilter) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        tickets.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        tickets
    }
}

fn balance_overflow() -> AppError {
    AppError::ValidationError("Wallet balance would be out of range".to_string())
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<MemoryTx> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx { guard, staged })
    }
}

impl StoreTx for MemoryTx {
    async fn commit(self) -> AppResult<()> {
        let MemoryTx { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }

    async fn insert_wallet(&mut self, wallet: &Wallet) -> AppResult<()> {
        self.staged.wallets.insert(wallet.id, wallet.clone());
        Ok(())
    }

    async fn find_wallet(&mut self, id: Uuid) -> AppResult<Option<Wallet>> {
        Ok(self.staged.wallets.get(&id).cloned())
    }

    async fn increment_wallet(&mut self, id: Uuid, delta: Decimal) -> AppResult<Option<Wallet>> {
        let Some(wallet) = self.staged.wallets.get_mut(&id) else {
            return Ok(None);
        };
        wallet.balance = wallet
            .balance
            .checked_add(delta)
            .ok_or_else(balance_overflow)?;
        wallet.updated_at = Utc::now();
        Ok(Some(wallet.clone()))
    }

    async fn insert_user(&mut self, user: &User) -> AppResult<()> {
        if self.staged.email_taken(&user.email, None) {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }
        self.staged.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .staged
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&mut self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.staged.users.values().cloned().collect();
        users.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(users)
    }

    async fn update_user(&mut self, user: &User) -> AppResult<()> {
        if self.staged.email_taken(&user.email, Some(user.id)) {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }
        match self.staged.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("User '{}' not found", user.id))),
        }
    }

    async fn insert_artist(&mut self, artist: &Artist) -> AppResult<()> {
        self.staged.artists.insert(artist.id, artist.clone());
        Ok(())
    }

    async fn find_artist(&mut self, id: Uuid) -> AppResult<Option<Artist>> {
        Ok(self.staged.artists.get(&id).cloned())
    }

    async fn list_artists(&mut self) -> AppResult<Vec<Artist>> {
        let mut artists: Vec<Artist> = self.staged.artists.values().cloned().collect();
        artists.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(artists)
    }

    async fn insert_concert(&mut self, concert: &Concert) -> AppResult<()> {
        self.staged.concerts.insert(concert.id, concert.clone());
        Ok(())
    }

    async fn find_concert(&mut self, id: Uuid) -> AppResult<Option<Concert>> {
        Ok(self.staged.concerts.get(&id).cloned())
    }

    async fn lock_concert(&mut self, id: Uuid) -> AppResult<Option<Concert>> {
        self.find_concert(id).await
    }

    async fn list_concerts(&mut self) -> AppResult<Vec<Concert>> {
        let mut concerts: Vec<Concert> = self.staged.concerts.values().cloned().collect();
        concerts.sort_by(|a, b| (a.date, a.id).cmp(&(b.date, b.id)));
        Ok(concerts)
    }

    async fn insert_tickets(&mut self, tickets: &[Ticket]) -> AppResult<()> {
        for ticket in tickets {
            self.staged.tickets.insert(ticket.id, ticket.clone());
        }
        Ok(())
    }

    async fn find_ticket(&mut self, id: Uuid) -> AppResult<Option<Ticket>> {
        Ok(self.staged.tickets.get(&id).cloned())
    }

    async fn lock_ticket(&mut self, id: Uuid) -> AppResult<Option<Ticket>> {
        self.find_ticket(id).await
    }

    async fn list_tickets(&mut self, filter: &TicketFilter) -> AppResult<Vec<Ticket>> {
        Ok(self.staged.sorted_tickets(filter))
    }

    async fn count_tickets(&mut self, concert_id: Uuid) -> AppResult<i64> {
        let count = self
            .staged
            .tickets
            .values()
            .filter(|t| t.concert_id == concert_id)
            .count();
        Ok(count as i64)
    }

    async fn claim_available(
        &mut self,
        concert_id: Uuid,
        seller_id: Uuid,
        price: Decimal,
        limit: i64,
    ) -> AppResult<Vec<Ticket>> {
        let filter = TicketFilter {
            concert_id: Some(concert_id),
            seller_id: Some(seller_id),
            status: Some(TicketStatus::Available),
            ..Default::default()
        };
        Ok(self
            .staged
            .sorted_tickets(&filter)
            .into_iter()
            .filter(|t| t.price == price)
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn mark_sold(&mut self, ticket_id: Uuid, buyer_id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        match self.staged.tickets.get_mut(&ticket_id) {
            Some(ticket) if ticket.is_available() => {
                ticket.status = TicketStatus::Sold;
                ticket.buyer_id = Some(buyer_id);
                ticket.sold_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_redeemed(&mut self, ticket_id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Ticket>> {
        match self.staged.tickets.get_mut(&ticket_id) {
            Some(ticket) if ticket.status == TicketStatus::Sold => {
                ticket.status = TicketStatus::Redeemed;
                ticket.redeemed_at = Some(at);
                Ok(Some(ticket.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn group_available(&mut self, concert_id: Option<Uuid>) -> AppResult<Vec<TicketGroupRow>> {
        let mut groups: BTreeMap<(Uuid, Uuid, Decimal, String), i64> = BTreeMap::new();
        for ticket in self.staged.tickets.values() {
            if !ticket.is_available() || concert_id.is_some_and(|id| id != ticket.concert_id) {
                continue;
            }
            let key = (ticket.concert_id, ticket.seller_id, ticket.price, ticket.kind.clone());
            *groups.entry(key).or_insert(0) += 1;
        }

        Ok(groups
            .into_iter()
            .map(|((concert_id, seller_id, price, kind), available)| TicketGroupRow {
                concert_id,
                seller_id,
                price,
                kind,
                available,
            })
            .collect())
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> AppResult<()> {
        self.staged.transactions.push(transaction.clone());
        Ok(())
    }

    async fn find_transaction(&mut self, id: Uuid) -> AppResult<Option<Transaction>> {
        Ok(self.staged.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn list_transactions_for(&mut self, user_id: Uuid) -> AppResult<Vec<Transaction>> {
        Ok(self
            .staged
            .transactions
            .iter()
            .rev()
            .filter(|t| t.involves(user_id))
            .cloned()
            .collect())
    }

    async fn count_transactions(&mut self) -> AppResult<i64> {
        Ok(self.staged.transactions.len() as i64)
    }
}
