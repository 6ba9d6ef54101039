use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{not_found, Marketplace};
use crate::auth::Principal;
use crate::models::{TicketDetails, TicketStatus};
use crate::store::{Store, StoreTx};
use crate::utils::{AppError, AppResult};

impl<S: Store> Marketplace<S> {
    /// Marks a sold ticket as used at the door. Only staff bound to the
    /// ticket's concert may redeem it, and only once.
    pub async fn redeem(&self, principal: Principal, ticket_id: Uuid) -> AppResult<TicketDetails> {
        let Principal::Staff { concert_id } = principal else {
            return Err(AppError::Forbidden(
                "Only venue staff can redeem tickets".to_string(),
            ));
        };

        let mut tx = self.store.begin().await?;
        let ticket = tx
            .lock_ticket(ticket_id)
            .await?
            .ok_or_else(|| not_found("Ticket", ticket_id))?;

        if ticket.concert_id != concert_id {
            warn!(
                ticket_id = %ticket_id,
                staff_concert_id = %concert_id,
                ticket_concert_id = %ticket.concert_id,
                "Redeem attempted for another concert"
            );
            return Err(AppError::Forbidden(
                "Ticket belongs to a different concert".to_string(),
            ));
        }
        match ticket.status {
            TicketStatus::Available => {
                return Err(AppError::Conflict(
                    "Ticket has not been sold".to_string(),
                ))
            }
            TicketStatus::Redeemed => {
                warn!(ticket_id = %ticket_id, "Ticket already redeemed");
                return Err(AppError::Conflict(
                    "Ticket has already been redeemed".to_string(),
                ));
            }
            TicketStatus::Sold => {}
        }

        let redeemed = tx
            .mark_redeemed(ticket.id, Utc::now())
            .await?
            .ok_or_else(|| AppError::Conflict("Ticket has already been redeemed".to_string()))?;
        let details = self.ticket_details_in(&mut tx, redeemed).await?;
        tx.commit().await?;

        info!(ticket_id = %ticket_id, concert_id = %concert_id, "Ticket redeemed");
        Ok(details)
    }
}
