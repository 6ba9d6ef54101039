//! Read models assembled by the query layer. Stored entities are never
//! decorated with computed fields; these types carry them instead.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{Artist, Concert, Ticket, Transaction, User, Wallet};

/// `redeemed` is a subset of `bought`; `selling` includes tickets already
/// sold.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub wallet: Wallet,
    pub total_selling: usize,
    pub total_bought: usize,
    pub total_redeemed: usize,
    pub selling: Vec<Ticket>,
    pub bought: Vec<Ticket>,
    pub redeemed: Vec<Ticket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConcertDetails {
    #[serde(flatten)]
    pub concert: Concert,
    pub artist: Option<Artist>,
    pub tickets: Vec<TicketDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketDetails {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub seller: User,
    pub buyer: Option<User>,
    pub concert: Concert,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketGroup {
    pub concert: Concert,
    pub artist: Option<Artist>,
    pub seller: User,
    pub price: Decimal,
    #[serde(rename = "type")]
    pub kind: String,
    pub available: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetails {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub payer: User,
    pub receiver: User,
    pub tickets: Vec<Ticket>,
}
