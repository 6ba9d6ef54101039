//! Read side. Each query opens its own transaction so the assembled view is
//! a consistent snapshot, and never commits.

use std::collections::HashMap;

use uuid::Uuid;

use super::{load_concert, load_ticket, load_user, not_found, Marketplace};
use crate::models::{
    Artist, Concert, ConcertDetails, Ticket, TicketDetails, TicketFilter, TicketGroup,
    Transaction, TransactionDetails, User, UserProfile,
};
use crate::store::{Store, StoreTx};
use crate::utils::{AppError, AppResult};

async fn cached_user<T: StoreTx>(
    tx: &mut T,
    cache: &mut HashMap<Uuid, User>,
    id: Uuid,
) -> AppResult<User> {
    if let Some(user) = cache.get(&id) {
        return Ok(user.clone());
    }
    let user = load_user(tx, id).await?;
    cache.insert(id, user.clone());
    Ok(user)
}

async fn cached_concert<T: StoreTx>(
    tx: &mut T,
    cache: &mut HashMap<Uuid, Concert>,
    id: Uuid,
) -> AppResult<Concert> {
    if let Some(concert) = cache.get(&id) {
        return Ok(concert.clone());
    }
    let concert = load_concert(tx, id).await?;
    cache.insert(id, concert.clone());
    Ok(concert)
}

/// Attaches seller, buyer and concert to each ticket, loading every user and
/// concert at most once.
async fn ticket_details<T: StoreTx>(tx: &mut T, tickets: Vec<Ticket>) -> AppResult<Vec<TicketDetails>> {
    let mut users = HashMap::new();
    let mut concerts = HashMap::new();
    let mut details = Vec::with_capacity(tickets.len());

    for ticket in tickets {
        let seller = cached_user(tx, &mut users, ticket.seller_id).await?;
        let buyer = match ticket.buyer_id {
            Some(id) => Some(cached_user(tx, &mut users, id).await?),
            None => None,
        };
        let concert = cached_concert(tx, &mut concerts, ticket.concert_id).await?;
        details.push(TicketDetails {
            ticket,
            seller,
            buyer,
            concert,
        });
    }
    Ok(details)
}

impl<S: Store> Marketplace<S> {
    /// `selling` is every ticket the user listed, `bought` every ticket they
    /// hold, and `redeemed` the part of `bought` already used at the door.
    pub(crate) async fn profile_in(&self, tx: &mut S::Tx, user: User) -> AppResult<UserProfile> {
        let wallet = tx
            .find_wallet(user.wallet_id)
            .await?
            .ok_or_else(|| not_found("Wallet", user.wallet_id))?;

        let selling = tx
            .list_tickets(&TicketFilter {
                seller_id: Some(user.id),
                ..Default::default()
            })
            .await?;
        let bought = tx
            .list_tickets(&TicketFilter {
                buyer_id: Some(user.id),
                ..Default::default()
            })
            .await?;
        let redeemed: Vec<Ticket> = bought.iter().filter(|t| t.is_redeemed()).cloned().collect();

        Ok(UserProfile {
            user,
            wallet,
            total_selling: selling.len(),
            total_bought: bought.len(),
            total_redeemed: redeemed.len(),
            selling,
            bought,
            redeemed,
        })
    }

    pub(crate) async fn ticket_details_in(
        &self,
        tx: &mut S::Tx,
        ticket: Ticket,
    ) -> AppResult<TicketDetails> {
        let id = ticket.id;
        ticket_details(tx, vec![ticket])
            .await?
            .pop()
            .ok_or_else(|| not_found("Ticket", id))
    }

    async fn concert_details_in(
        &self,
        tx: &mut S::Tx,
        concert: Concert,
    ) -> AppResult<ConcertDetails> {
        let artist = tx.find_artist(concert.artist_id).await?;
        let tickets = tx
            .list_tickets(&TicketFilter {
                concert_id: Some(concert.id),
                ..Default::default()
            })
            .await?;
        let tickets = ticket_details(tx, tickets).await?;
        Ok(ConcertDetails {
            concert,
            artist,
            tickets,
        })
    }

    pub async fn user(&self, user_id: Uuid) -> AppResult<UserProfile> {
        let mut tx = self.store.begin().await?;
        let user = load_user(&mut tx, user_id).await?;
        self.profile_in(&mut tx, user).await
    }

    pub async fn users(&self) -> AppResult<Vec<UserProfile>> {
        let mut tx = self.store.begin().await?;
        let users = tx.list_users().await?;
        let mut profiles = Vec::with_capacity(users.len());
        for user in users {
            profiles.push(self.profile_in(&mut tx, user).await?);
        }
        Ok(profiles)
    }

    pub async fn artist(&self, artist_id: Uuid) -> AppResult<Artist> {
        let mut tx = self.store.begin().await?;
        tx.find_artist(artist_id)
            .await?
            .ok_or_else(|| not_found("Artist", artist_id))
    }

    pub async fn artists(&self) -> AppResult<Vec<Artist>> {
        let mut tx = self.store.begin().await?;
        tx.list_artists().await
    }

    pub async fn concert(&self, concert_id: Uuid) -> AppResult<ConcertDetails> {
        let mut tx = self.store.begin().await?;
        let concert = load_concert(&mut tx, concert_id).await?;
        self.concert_details_in(&mut tx, concert).await
    }

    pub async fn concerts(&self) -> AppResult<Vec<ConcertDetails>> {
        let mut tx = self.store.begin().await?;
        let concerts = tx.list_concerts().await?;
        let mut details = Vec::with_capacity(concerts.len());
        for concert in concerts {
            details.push(self.concert_details_in(&mut tx, concert).await?);
        }
        Ok(details)
    }

    pub async fn ticket(&self, ticket_id: Uuid) -> AppResult<TicketDetails> {
        let mut tx = self.store.begin().await?;
        let ticket = load_ticket(&mut tx, ticket_id).await?;
        self.ticket_details_in(&mut tx, ticket).await
    }

    pub async fn tickets(&self, filter: TicketFilter) -> AppResult<Vec<TicketDetails>> {
        let mut tx = self.store.begin().await?;
        let tickets = tx.list_tickets(&filter).await?;
        ticket_details(&mut tx, tickets).await
    }

    /// Available tickets collapsed into one entry per concert, seller, price
    /// and kind. This is what a buyer picks from before a bulk purchase.
    pub async fn tickets_grouped(&self, concert_id: Option<Uuid>) -> AppResult<Vec<TicketGroup>> {
        let mut tx = self.store.begin().await?;
        let rows = tx.group_available(concert_id).await?;

        let mut concerts: HashMap<Uuid, (Concert, Option<Artist>)> = HashMap::new();
        let mut sellers: HashMap<Uuid, User> = HashMap::new();
        let mut groups = Vec::with_capacity(rows.len());

        for row in rows {
            if !concerts.contains_key(&row.concert_id) {
                let concert = load_concert(&mut tx, row.concert_id).await?;
                let artist = tx.find_artist(concert.artist_id).await?;
                concerts.insert(row.concert_id, (concert, artist));
            }
            let seller = cached_user(&mut tx, &mut sellers, row.seller_id).await?;

            let (concert, artist) = &concerts[&row.concert_id];
            groups.push(TicketGroup {
                concert: concert.clone(),
                artist: artist.clone(),
                seller,
                price: row.price,
                kind: row.kind,
                available: row.available,
            });
        }
        Ok(groups)
    }

    /// Transactions the user paid or received, newest first.
    pub async fn transactions(&self, user_id: Uuid) -> AppResult<Vec<Transaction>> {
        let mut tx = self.store.begin().await?;
        tx.list_transactions_for(user_id).await
    }

    pub async fn transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> AppResult<TransactionDetails> {
        let mut tx = self.store.begin().await?;
        let transaction = tx
            .find_transaction(transaction_id)
            .await?
            .ok_or_else(|| not_found("Transaction", transaction_id))?;
        if !transaction.involves(user_id) {
            return Err(AppError::Forbidden(
                "You are not a party to this transaction".to_string(),
            ));
        }

        let payer = load_user(&mut tx, transaction.payer_id).await?;
        let receiver = load_user(&mut tx, transaction.receiver_id).await?;
        let mut tickets = Vec::with_capacity(transaction.ticket_ids.len());
        for &ticket_id in &transaction.ticket_ids {
            tickets.push(load_ticket(&mut tx, ticket_id).await?);
        }

        Ok(TransactionDetails {
            transaction,
            payer,
            receiver,
            tickets,
        })
    }
}
