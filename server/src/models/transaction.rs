use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable record of one wallet-to-wallet transfer.
///
/// `ticket_ids` lists every ticket the payment settled, so a bulk purchase
/// stays traceable down to the individual tickets.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub amount: Decimal,
    pub payer_id: Uuid,
    pub receiver_id: Uuid,
    pub concert_id: Option<Uuid>,
    pub ticket_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.payer_id == user_id || self.receiver_id == user_id
    }
}
