use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction as PgTransaction};
use uuid::Uuid;

use super::{Store, StoreTx};
use crate::models::{
    Artist, Concert, Ticket, TicketFilter, TicketGroupRow, Transaction, User, Wallet,
};
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!("Successfully connected to database");
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Migration failed: {e}")))?;

        tracing::info!("Migrations run successfully");
        Ok(())
    }
}

pub struct PgTx {
    tx: PgTransaction<'static, Postgres>,
}

fn email_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict("A user with this email already exists".to_string());
        }
    }
    AppError::DatabaseError(e)
}

/// `numeric_value_out_of_range`: the balance no longer fits `NUMERIC(18,2)`.
fn balance_overflow(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code().as_deref() == Some("22003") {
            return AppError::ValidationError("Wallet balance would be out of range".to_string());
        }
    }
    AppError::DatabaseError(e)
}

impl Store for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> AppResult<PgTx> {
        let tx = self.pool.begin().await?;
        Ok(PgTx { tx })
    }
}

impl StoreTx for PgTx {
    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn insert_wallet(&mut self, wallet: &Wallet) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO wallets (id, balance, created_at, updated_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(wallet.id)
        .bind(wallet.balance)
        .bind(wallet.created_at)
        .bind(wallet.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_wallet(&mut self, id: Uuid) -> AppResult<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(wallet)
    }

    async fn increment_wallet(&mut self, id: Uuid, delta: Decimal) -> AppResult<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>(
            "UPDATE wallets SET balance = balance + $2, updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(balance_overflow)?;
        Ok(wallet)
    }

    async fn insert_user(&mut self, user: &User) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO users
                (id, username, email, password_hash, password_score, password_strength,
                 wallet_id, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.password_score)
        .bind(user.password_strength)
        .bind(user.wallet_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(email_conflict)?;
        Ok(())
    }

    async fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn list_users(&mut self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at, id")
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(users)
    }

    async fn update_user(&mut self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE users
             SET username = $2, email = $3, password_hash = $4, password_score = $5,
                 password_strength = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.password_score)
        .bind(user.password_strength)
        .bind(user.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(email_conflict)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User '{}' not found", user.id)));
        }
        Ok(())
    }

    async fn insert_artist(&mut self, artist: &Artist) -> AppResult<()> {
        sqlx::query("INSERT INTO artists (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(artist.id)
            .bind(&artist.name)
            .bind(artist.created_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_artist(&mut self, id: Uuid) -> AppResult<Option<Artist>> {
        let artist = sqlx::query_as::<_, Artist>("SELECT * FROM artists WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(artist)
    }

    async fn list_artists(&mut self) -> AppResult<Vec<Artist>> {
        let artists = sqlx::query_as::<_, Artist>("SELECT * FROM artists ORDER BY name, id")
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(artists)
    }

    async fn insert_concert(&mut self, concert: &Concert) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO concerts
                (id, artist_id, title, date, address, capacity, genre, kind, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(concert.id)
        .bind(concert.artist_id)
        .bind(&concert.title)
        .bind(concert.date)
        .bind(&concert.address)
        .bind(concert.capacity)
        .bind(&concert.genre)
        .bind(&concert.kind)
        .bind(concert.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_concert(&mut self, id: Uuid) -> AppResult<Option<Concert>> {
        let concert = sqlx::query_as::<_, Concert>("SELECT * FROM concerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(concert)
    }

    async fn lock_concert(&mut self, id: Uuid) -> AppResult<Option<Concert>> {
        let concert =
            sqlx::query_as::<_, Concert>("SELECT * FROM concerts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(concert)
    }

    async fn list_concerts(&mut self) -> AppResult<Vec<Concert>> {
        let concerts = sqlx::query_as::<_, Concert>("SELECT * FROM concerts ORDER BY date, id")
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(concerts)
    }

    async fn insert_tickets(&mut self, tickets: &[Ticket]) -> AppResult<()> {
        for ticket in tickets {
            sqlx::query(
                "INSERT INTO tickets
                    (id, concert_id, seller_id, buyer_id, kind, price, status,
                     sold_at, redeemed_at, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(ticket.id)
            .bind(ticket.concert_id)
            .bind(ticket.seller_id)
            .bind(ticket.buyer_id)
            .bind(&ticket.kind)
            .bind(ticket.price)
            .bind(ticket.status)
            .bind(ticket.sold_at)
            .bind(ticket.redeemed_at)
            .bind(ticket.created_at)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn find_ticket(&mut self, id: Uuid) -> AppResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(ticket)
    }

    async fn lock_ticket(&mut self, id: Uuid) -> AppResult<Option<Ticket>> {
        let ticket =
            sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(ticket)
    }

    async fn list_tickets(&mut self, filter: &TicketFilter) -> AppResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets
             WHERE ($1::uuid IS NULL OR concert_id = $1)
               AND ($2::uuid IS NULL OR seller_id = $2)
               AND ($3::uuid IS NULL OR buyer_id = $3)
               AND ($4::ticket_status IS NULL OR status = $4)
             ORDER BY created_at, id",
        )
        .bind(filter.concert_id)
        .bind(filter.seller_id)
        .bind(filter.buyer_id)
        .bind(filter.status)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(tickets)
    }

    async fn count_tickets(&mut self, concert_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE concert_id = $1")
            .bind(concert_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn claim_available(
        &mut self,
        concert_id: Uuid,
        seller_id: Uuid,
        price: Decimal,
        limit: i64,
    ) -> AppResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT * FROM tickets
             WHERE concert_id = $1 AND seller_id = $2 AND price = $3 AND status = 'available'
             ORDER BY created_at, id
             LIMIT $4
             FOR UPDATE SKIP LOCKED",
        )
        .bind(concert_id)
        .bind(seller_id)
        .bind(price)
        .bind(limit)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(tickets)
    }

    async fn mark_sold(&mut self, ticket_id: Uuid, buyer_id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE tickets SET status = 'sold', buyer_id = $2, sold_at = $3
             WHERE id = $1 AND status = 'available'",
        )
        .bind(ticket_id)
        .bind(buyer_id)
        .bind(at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_redeemed(&mut self, ticket_id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "UPDATE tickets SET status = 'redeemed', redeemed_at = $2
             WHERE id = $1 AND status = 'sold'
             RETURNING *",
        )
        .bind(ticket_id)
        .bind(at)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(ticket)
    }

    async fn group_available(&mut self, concert_id: Option<Uuid>) -> AppResult<Vec<TicketGroupRow>> {
        let groups = sqlx::query_as::<_, TicketGroupRow>(
            "SELECT concert_id, seller_id, price, kind, COUNT(*) AS available
             FROM tickets
             WHERE status = 'available' AND ($1::uuid IS NULL OR concert_id = $1)
             GROUP BY concert_id, seller_id, price, kind
             ORDER BY concert_id, seller_id, price, kind",
        )
        .bind(concert_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(groups)
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO transactions
                (id, amount, payer_id, receiver_id, concert_id, ticket_ids, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(transaction.id)
        .bind(transaction.amount)
        .bind(transaction.payer_id)
        .bind(transaction.receiver_id)
        .bind(transaction.concert_id)
        .bind(&transaction.ticket_ids)
        .bind(transaction.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_transaction(&mut self, id: Uuid) -> AppResult<Option<Transaction>> {
        let transaction =
            sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(transaction)
    }

    async fn list_transactions_for(&mut self, user_id: Uuid) -> AppResult<Vec<Transaction>> {
        let transactions = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions
             WHERE payer_id = $1 OR receiver_id = $1
             ORDER BY created_at DESC, id",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(transactions)
    }

    async fn count_transactions(&mut self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }
}
