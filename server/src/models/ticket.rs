use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of a ticket. Transitions only move forward:
/// `Available -> Sold -> Redeemed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Available,
    Sold,
    Redeemed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub concert_id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: Decimal,
    pub status: TicketStatus,
    pub sold_at: Option<DateTime<Utc>>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new_listing(
        concert_id: Uuid,
        seller_id: Uuid,
        kind: String,
        price: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            concert_id,
            seller_id,
            buyer_id: None,
            kind,
            price,
            status: TicketStatus::Available,
            sold_at: None,
            redeemed_at: None,
            created_at,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == TicketStatus::Available
    }

    pub fn is_redeemed(&self) -> bool {
        self.status == TicketStatus::Redeemed
    }
}

/// Filter for ticket listings. `None` fields do not constrain the result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketFilter {
    pub concert_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub buyer_id: Option<Uuid>,
    pub status: Option<TicketStatus>,
}

impl TicketFilter {
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.concert_id.map_or(true, |id| ticket.concert_id == id)
            && self.seller_id.map_or(true, |id| ticket.seller_id == id)
            && self.buyer_id.map_or(true, |id| ticket.buyer_id == Some(id))
            && self.status.map_or(true, |s| ticket.status == s)
    }
}

/// Count of available tickets sharing concert, seller, price and kind.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TicketGroupRow {
    pub concert_id: Uuid,
    pub seller_id: Uuid,
    pub price: Decimal,
    pub kind: String,
    pub available: i64,
}
