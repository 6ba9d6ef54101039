//! Ticket purchases.
//!
//! A purchase claims tickets, moves money from the buyer's wallet to the
//! seller's, and appends one transaction record, all in a single store
//! transaction. If any step fails nothing is written.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::ledger::validate_money;
use super::{load_concert, load_user, not_found, Marketplace};
use crate::models::{TicketStatus, Transaction};
use crate::store::{Store, StoreTx};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct BulkPurchase {
    pub number: u32,
    pub concert_id: Uuid,
    pub seller_id: Uuid,
    pub price: Decimal,
}

impl<S: Store> Marketplace<S> {
    pub async fn buy(&self, buyer_id: Uuid, ticket_id: Uuid) -> AppResult<Transaction> {
        let mut tx = self.store.begin().await?;

        let ticket = tx
            .lock_ticket(ticket_id)
            .await?
            .ok_or_else(|| not_found("Ticket", ticket_id))?;
        if ticket.status != TicketStatus::Available {
            warn!(ticket_id = %ticket_id, status = ?ticket.status, "Ticket no longer available");
            return Err(AppError::Conflict("Ticket has already been sold".to_string()));
        }
        if ticket.seller_id == buyer_id {
            return Err(AppError::ValidationError(
                "You cannot buy your own ticket".to_string(),
            ));
        }

        let buyer = load_user(&mut tx, buyer_id).await?;
        let seller = load_user(&mut tx, ticket.seller_id).await?;

        self.ledger
            .transfer(&mut tx, buyer.wallet_id, seller.wallet_id, ticket.price)
            .await?;

        let now = Utc::now();
        if !tx.mark_sold(ticket.id, buyer.id, now).await? {
            return Err(AppError::Conflict("Ticket has already been sold".to_string()));
        }

        let transaction = Transaction {
            id: Uuid::new_v4(),
            amount: ticket.price,
            payer_id: buyer.id,
            receiver_id: seller.id,
            concert_id: Some(ticket.concert_id),
            ticket_ids: vec![ticket.id],
            created_at: now,
        };
        tx.insert_transaction(&transaction).await?;
        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            ticket_id = %ticket.id,
            buyer_id = %buyer.id,
            seller_id = %seller.id,
            amount = %transaction.amount,
            "Ticket purchased"
        );
        Ok(transaction)
    }

    /// Buys `number` tickets from one seller's pool at a fixed unit price.
    /// Availability is checked before any money moves; a short pool fails the
    /// whole purchase.
    pub async fn buy_bulk(&self, buyer_id: Uuid, order: BulkPurchase) -> AppResult<Transaction> {
        if order.number == 0 {
            return Err(AppError::ValidationError(
                "number must be at least 1".to_string(),
            ));
        }
        let price = validate_money("price", order.price)?;
        if price < Decimal::ZERO {
            return Err(AppError::ValidationError(
                "price cannot be negative".to_string(),
            ));
        }
        if order.seller_id == buyer_id {
            return Err(AppError::ValidationError(
                "You cannot buy your own tickets".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let concert = load_concert(&mut tx, order.concert_id).await?;
        let buyer = load_user(&mut tx, buyer_id).await?;
        let seller = load_user(&mut tx, order.seller_id).await?;

        let claimed = tx
            .claim_available(concert.id, seller.id, price, i64::from(order.number))
            .await?;
        if claimed.len() < order.number as usize {
            warn!(
                concert_id = %concert.id,
                seller_id = %seller.id,
                requested = order.number,
                available = claimed.len(),
                "Bulk purchase exceeds availability"
            );
            return Err(AppError::Conflict(format!(
                "Only {} of {} requested tickets are available",
                claimed.len(),
                order.number
            )));
        }

        let amount = price
            .checked_mul(Decimal::from(order.number))
            .ok_or_else(|| AppError::ValidationError("amount is out of range".to_string()))
            .and_then(|amount| validate_money("amount", amount))?;
        self.ledger
            .transfer(&mut tx, buyer.wallet_id, seller.wallet_id, amount)
            .await?;

        let now = Utc::now();
        for ticket in &claimed {
            if !tx.mark_sold(ticket.id, buyer.id, now).await? {
                return Err(AppError::Conflict(format!(
                    "Ticket '{}' was sold concurrently",
                    ticket.id
                )));
            }
        }

        let transaction = Transaction {
            id: Uuid::new_v4(),
            amount,
            payer_id: buyer.id,
            receiver_id: seller.id,
            concert_id: Some(concert.id),
            ticket_ids: claimed.iter().map(|t| t.id).collect(),
            created_at: now,
        };
        tx.insert_transaction(&transaction).await?;
        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            concert_id = %concert.id,
            buyer_id = %buyer.id,
            seller_id = %seller.id,
            count = claimed.len(),
            amount = %amount,
            "Bulk purchase completed"
        );
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::testing;
    use crate::models::TicketFilter;

    async fn transaction_count<S: Store>(market: &Marketplace<S>) -> i64 {
        let mut tx = market.store().begin().await.unwrap();
        let count = tx.count_transactions().await.unwrap();
        count
    }

    #[tokio::test]
    async fn test_buy_moves_money_from_buyer_to_seller() {
        let market = testing::market(true);
        let seller = testing::user(&market, "seller@example.com").await;
        let buyer = testing::user(&market, "buyer@example.com").await;
        let concert = testing::concert(&market, 10).await;
        let ticket = testing::listings(&market, seller, concert.id, 1, 25).await.remove(0);

        let transaction = market.buy(buyer, ticket.id).await.unwrap();

        assert_eq!(transaction.amount, Decimal::from(25));
        assert_eq!(transaction.payer_id, buyer);
        assert_eq!(transaction.receiver_id, seller);
        assert_eq!(transaction.ticket_ids, vec![ticket.id]);
        assert_eq!(testing::balance(&market, buyer).await, Decimal::from(-25));
        assert_eq!(testing::balance(&market, seller).await, Decimal::from(25));

        let sold = market.ticket(ticket.id).await.unwrap();
        assert_eq!(sold.ticket.buyer_id, Some(buyer));
        assert_eq!(sold.ticket.status, TicketStatus::Sold);
        assert!(sold.ticket.sold_at.is_some());
    }

    #[tokio::test]
    async fn test_buy_twice_conflicts() {
        let market = testing::market(true);
        let seller = testing::user(&market, "seller@example.com").await;
        let first = testing::user(&market, "first@example.com").await;
        let second = testing::user(&market, "second@example.com").await;
        let concert = testing::concert(&market, 10).await;
        let ticket = testing::listings(&market, seller, concert.id, 1, 25).await.remove(0);

        market.buy(first, ticket.id).await.unwrap();
        let result = market.buy(second, ticket.id).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(testing::balance(&market, second).await, Decimal::ZERO);
        assert_eq!(testing::balance(&market, seller).await, Decimal::from(25));
        assert_eq!(transaction_count(&market).await, 1);
    }

    #[tokio::test]
    async fn test_buy_unknown_ticket_not_found() {
        let market = testing::market(true);
        let buyer = testing::user(&market, "buyer@example.com").await;

        let result = market.buy(buyer, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_buy_own_ticket_rejected() {
        let market = testing::market(true);
        let seller = testing::user(&market, "seller@example.com").await;
        let concert = testing::concert(&market, 10).await;
        let ticket = testing::listings(&market, seller, concert.id, 1, 25).await.remove(0);

        let result = market.buy(seller, ticket.id).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_everything_untouched() {
        let market = testing::market(false);
        let seller = testing::user(&market, "seller@example.com").await;
        let buyer = testing::user(&market, "buyer@example.com").await;
        let concert = testing::concert(&market, 10).await;
        let ticket = testing::listings(&market, seller, concert.id, 1, 25).await.remove(0);
        testing::fund(&market, buyer, 20).await;

        let result = market.buy(buyer, ticket.id).await;

        assert!(matches!(result, Err(AppError::InsufficientFunds(_))));
        assert_eq!(testing::balance(&market, buyer).await, Decimal::from(20));
        assert_eq!(testing::balance(&market, seller).await, Decimal::ZERO);
        assert!(market.ticket(ticket.id).await.unwrap().ticket.is_available());
        assert_eq!(transaction_count(&market).await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_buyers_exactly_one_wins() {
        let market = Arc::new(testing::market(true));
        let seller = testing::user(&market, "seller@example.com").await;
        let concert = testing::concert(&market, 10).await;
        let ticket = testing::listings(&market, seller, concert.id, 1, 25).await.remove(0);

        let mut buyers = Vec::new();
        for i in 0..8 {
            buyers.push(testing::user(&market, &format!("buyer{i}@example.com")).await);
        }

        let handles: Vec<_> = buyers
            .iter()
            .map(|&buyer| {
                let market = Arc::clone(&market);
                tokio::spawn(async move { market.buy(buyer, ticket.id).await })
            })
            .collect();

        let mut wins = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => wins += 1,
                Err(AppError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(conflicts, buyers.len() - 1);
        assert_eq!(testing::balance(&market, seller).await, Decimal::from(25));
        assert_eq!(transaction_count(&market).await, 1);
    }

    #[tokio::test]
    async fn test_bulk_purchase_short_pool_fails_without_side_effects() {
        let market = testing::market(false);
        let seller = testing::user(&market, "seller@example.com").await;
        let buyer = testing::user(&market, "buyer@example.com").await;
        let concert = testing::concert(&market, 10).await;
        testing::listings(&market, seller, concert.id, 3, 10).await;

        let result = market
            .buy_bulk(
                buyer,
                BulkPurchase {
                    number: 5,
                    concert_id: concert.id,
                    seller_id: seller,
                    price: Decimal::from(10),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(testing::balance(&market, buyer).await, Decimal::ZERO);
        assert_eq!(testing::balance(&market, seller).await, Decimal::ZERO);
        assert_eq!(transaction_count(&market).await, 0);

        let still_available = market
            .tickets(TicketFilter {
                concert_id: Some(concert.id),
                status: Some(TicketStatus::Available),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(still_available.len(), 3);
    }

    #[tokio::test]
    async fn test_bulk_purchase_claims_oldest_and_records_manifest() {
        let market = testing::market(false);
        let seller = testing::user(&market, "seller@example.com").await;
        let buyer = testing::user(&market, "buyer@example.com").await;
        let concert = testing::concert(&market, 10).await;
        testing::fund(&market, buyer, 100).await;

        let first_batch = testing::listings(&market, seller, concert.id, 2, 10).await;
        let second_batch = testing::listings(&market, seller, concert.id, 2, 10).await;
        testing::listings(&market, seller, concert.id, 2, 15).await;

        let transaction = market
            .buy_bulk(
                buyer,
                BulkPurchase {
                    number: 3,
                    concert_id: concert.id,
                    seller_id: seller,
                    price: Decimal::from(10),
                },
            )
            .await
            .unwrap();

        assert_eq!(transaction.amount, Decimal::from(30));
        assert_eq!(transaction.concert_id, Some(concert.id));
        assert_eq!(transaction.ticket_ids.len(), 3);
        for ticket in &first_batch {
            assert!(transaction.ticket_ids.contains(&ticket.id));
        }
        assert_eq!(
            second_batch
                .iter()
                .filter(|t| transaction.ticket_ids.contains(&t.id))
                .count(),
            1
        );

        assert_eq!(testing::balance(&market, buyer).await, Decimal::from(70));
        assert_eq!(testing::balance(&market, seller).await, Decimal::from(30));

        let bought = market.user(buyer).await.unwrap();
        assert_eq!(bought.total_bought, 3);
        assert!(bought.bought.iter().all(|t| t.price == Decimal::from(10)));
    }

    #[tokio::test]
    async fn test_bulk_purchase_validates_input() {
        let market = testing::market(true);
        let seller = testing::user(&market, "seller@example.com").await;
        let buyer = testing::user(&market, "buyer@example.com").await;
        let concert = testing::concert(&market, 10).await;

        let order = |number, seller_id| BulkPurchase {
            number,
            concert_id: concert.id,
            seller_id,
            price: Decimal::from(10),
        };

        assert!(matches!(
            market.buy_bulk(buyer, order(0, seller)).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            market.buy_bulk(seller, order(1, seller)).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            market.buy_bulk(buyer, order(1, Uuid::new_v4())).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bulk_total_beyond_range_rejected() {
        let market = testing::market(true);
        let seller = testing::user(&market, "seller@example.com").await;
        let buyer = testing::user(&market, "buyer@example.com").await;
        let concert = testing::concert(&market, 10).await;
        let unit = 9_000_000_000_000_000_i64;
        testing::listings(&market, seller, concert.id, 2, unit).await;

        let result = market
            .buy_bulk(
                buyer,
                BulkPurchase {
                    number: 2,
                    concert_id: concert.id,
                    seller_id: seller,
                    price: Decimal::from(unit),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
        assert_eq!(testing::balance(&market, buyer).await, Decimal::ZERO);
        assert_eq!(transaction_count(&market).await, 0);
    }

    #[tokio::test]
    async fn test_bulk_price_with_sub_cent_precision_rejected() {
        let market = testing::market(true);
        let seller = testing::user(&market, "seller@example.com").await;
        let buyer = testing::user(&market, "buyer@example.com").await;
        let concert = testing::concert(&market, 10).await;

        let result = market
            .buy_bulk(
                buyer,
                BulkPurchase {
                    number: 1,
                    concert_id: concert.id,
                    seller_id: seller,
                    price: Decimal::new(10_005, 3),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
