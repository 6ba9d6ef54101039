use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use uuid::Uuid;

use crate::auth::{AuthUser, Principal};
use crate::engine::{BulkPurchase, DepositInput};
use crate::store::Store;
use crate::utils::response::{created, success};
use crate::utils::AppResult;
use crate::AppState;

pub async fn buy<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(buyer_id): AuthUser,
    Path(ticket_id): Path<Uuid>,
) -> AppResult<Response> {
    let transaction = state.marketplace.buy(buyer_id, ticket_id).await?;
    Ok(created(transaction, "Ticket purchased"))
}

pub async fn buy_bulk<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(buyer_id): AuthUser,
    Json(order): Json<BulkPurchase>,
) -> AppResult<Response> {
    let transaction = state.marketplace.buy_bulk(buyer_id, order).await?;
    Ok(created(transaction, "Tickets purchased"))
}

pub async fn redeem<S: Store>(
    State(state): State<AppState<S>>,
    principal: Principal,
    Path(ticket_id): Path<Uuid>,
) -> AppResult<Response> {
    let ticket = state.marketplace.redeem(principal, ticket_id).await?;
    Ok(success(ticket, "Ticket redeemed"))
}

pub async fn deposit<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user_id): AuthUser,
    Json(input): Json<DepositInput>,
) -> AppResult<Response> {
    let wallet = state.marketplace.deposit(user_id, input).await?;
    Ok(success(wallet, "Wallet updated"))
}

pub async fn list_transactions<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Response> {
    let transactions = state.marketplace.transactions(user_id).await?;
    Ok(success(transactions, "Transactions retrieved"))
}

pub async fn get_transaction<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user_id): AuthUser,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<Response> {
    let transaction = state.marketplace.transaction(user_id, transaction_id).await?;
    Ok(success(transaction, "Transaction retrieved"))
}
