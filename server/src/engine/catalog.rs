use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::ledger::validate_money;
use super::{load_user, not_found, require_text, Marketplace};
use crate::models::{Artist, Concert, ConcertDetails, Ticket};
use crate::store::{Store, StoreTx};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateConcert {
    pub title: String,
    pub date: DateTime<Utc>,
    pub address: String,
    pub capacity: i32,
    pub genre: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub artist_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTicket {
    #[serde(rename = "type")]
    pub kind: String,
    pub price: Decimal,
    pub concert_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTickets {
    pub amount: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: Decimal,
    pub concert_id: Uuid,
}

impl<S: Store> Marketplace<S> {
    pub async fn create_artist(&self, input: CreateArtist) -> AppResult<Artist> {
        let artist = Artist {
            id: Uuid::new_v4(),
            name: require_text("name", &input.name)?,
            created_at: Utc::now(),
        };

        let mut tx = self.store.begin().await?;
        tx.insert_artist(&artist).await?;
        tx.commit().await?;

        info!(artist_id = %artist.id, "Artist created");
        Ok(artist)
    }

    pub async fn create_concert(&self, input: CreateConcert) -> AppResult<ConcertDetails> {
        if input.capacity <= 0 {
            return Err(AppError::ValidationError(
                "capacity must be positive".to_string(),
            ));
        }

        let concert = Concert {
            id: Uuid::new_v4(),
            artist_id: input.artist_id,
            title: require_text("title", &input.title)?,
            date: input.date,
            address: require_text("address", &input.address)?,
            capacity: input.capacity,
            genre: input.genre.filter(|g| !g.trim().is_empty()),
            kind: input.kind.filter(|k| !k.trim().is_empty()),
            created_at: Utc::now(),
        };

        let mut tx = self.store.begin().await?;
        let artist = tx
            .find_artist(input.artist_id)
            .await?
            .ok_or_else(|| not_found("Artist", input.artist_id))?;
        tx.insert_concert(&concert).await?;
        tx.commit().await?;

        info!(concert_id = %concert.id, artist_id = %artist.id, "Concert created");
        Ok(ConcertDetails {
            concert,
            artist: Some(artist),
            tickets: Vec::new(),
        })
    }

    /// Lists one ticket for sale by the calling user.
    pub async fn create_ticket(&self, seller_id: Uuid, input: CreateTicket) -> AppResult<Ticket> {
        let mut tickets = self
            .create_tickets(
                seller_id,
                CreateTickets {
                    amount: 1,
                    kind: input.kind,
                    price: input.price,
                    concert_id: input.concert_id,
                },
            )
            .await?;
        tickets
            .pop()
            .ok_or_else(|| AppError::InternalServerError("No ticket was created".to_string()))
    }

    /// Lists `amount` identical tickets for sale by the calling user. The
    /// concert's capacity bounds the total number of tickets it can have.
    pub async fn create_tickets(&self, seller_id: Uuid, input: CreateTickets) -> AppResult<Vec<Ticket>> {
        if input.amount == 0 {
            return Err(AppError::ValidationError(
                "amount must be at least 1".to_string(),
            ));
        }
        let price = validate_money("price", input.price)?;
        if price < Decimal::ZERO {
            return Err(AppError::ValidationError(
                "price cannot be negative".to_string(),
            ));
        }
        let kind = require_text("type", &input.kind)?;

        let mut tx = self.store.begin().await?;
        let seller = load_user(&mut tx, seller_id).await?;
        let concert = tx
            .lock_concert(input.concert_id)
            .await?
            .ok_or_else(|| not_found("Concert", input.concert_id))?;

        let existing = tx.count_tickets(concert.id).await?;
        if existing + i64::from(input.amount) > i64::from(concert.capacity) {
            warn!(
                concert_id = %concert.id,
                existing,
                requested = input.amount,
                capacity = concert.capacity,
                "Ticket listing exceeds capacity"
            );
            return Err(AppError::Conflict(format!(
                "Concert capacity of {} would be exceeded ({} tickets already listed)",
                concert.capacity, existing
            )));
        }

        let now = Utc::now();
        let tickets: Vec<Ticket> = (0..input.amount)
            .map(|_| Ticket::new_listing(concert.id, seller.id, kind.clone(), price, now))
            .collect();
        tx.insert_tickets(&tickets).await?;
        tx.commit().await?;

        info!(
            concert_id = %concert.id,
            seller_id = %seller.id,
            count = tickets.len(),
            price = %price,
            "Tickets listed"
        );
        Ok(tickets)
    }
}
