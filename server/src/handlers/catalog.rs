use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::engine::{CreateArtist, CreateConcert, CreateTicket, CreateTickets};
use crate::models::TicketFilter;
use crate::store::Store;
use crate::utils::response::{created, success};
use crate::utils::AppResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct GroupedQuery {
    pub concert_id: Option<Uuid>,
}

pub async fn list_artists<S: Store>(State(state): State<AppState<S>>) -> AppResult<Response> {
    let artists = state.marketplace.artists().await?;
    Ok(success(artists, "Artists retrieved"))
}

pub async fn get_artist<S: Store>(
    State(state): State<AppState<S>>,
    Path(artist_id): Path<Uuid>,
) -> AppResult<Response> {
    let artist = state.marketplace.artist(artist_id).await?;
    Ok(success(artist, "Artist retrieved"))
}

pub async fn create_artist<S: Store>(
    State(state): State<AppState<S>>,
    _caller: AuthUser,
    Json(input): Json<CreateArtist>,
) -> AppResult<Response> {
    let artist = state.marketplace.create_artist(input).await?;
    Ok(created(artist, "Artist created"))
}

pub async fn list_concerts<S: Store>(State(state): State<AppState<S>>) -> AppResult<Response> {
    let concerts = state.marketplace.concerts().await?;
    Ok(success(concerts, "Concerts retrieved"))
}

pub async fn get_concert<S: Store>(
    State(state): State<AppState<S>>,
    Path(concert_id): Path<Uuid>,
) -> AppResult<Response> {
    let concert = state.marketplace.concert(concert_id).await?;
    Ok(success(concert, "Concert retrieved"))
}

pub async fn create_concert<S: Store>(
    State(state): State<AppState<S>>,
    _caller: AuthUser,
    Json(input): Json<CreateConcert>,
) -> AppResult<Response> {
    let concert = state.marketplace.create_concert(input).await?;
    Ok(created(concert, "Concert created"))
}

pub async fn list_tickets<S: Store>(
    State(state): State<AppState<S>>,
    Query(filter): Query<TicketFilter>,
) -> AppResult<Response> {
    let tickets = state.marketplace.tickets(filter).await?;
    Ok(success(tickets, "Tickets retrieved"))
}

pub async fn tickets_grouped<S: Store>(
    State(state): State<AppState<S>>,
    Query(query): Query<GroupedQuery>,
) -> AppResult<Response> {
    let groups = state.marketplace.tickets_grouped(query.concert_id).await?;
    Ok(success(groups, "Ticket groups retrieved"))
}

pub async fn get_ticket<S: Store>(
    State(state): State<AppState<S>>,
    Path(ticket_id): Path<Uuid>,
) -> AppResult<Response> {
    let ticket = state.marketplace.ticket(ticket_id).await?;
    Ok(success(ticket, "Ticket retrieved"))
}

pub async fn create_ticket<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(seller_id): AuthUser,
    Json(input): Json<CreateTicket>,
) -> AppResult<Response> {
    let ticket = state.marketplace.create_ticket(seller_id, input).await?;
    Ok(created(ticket, "Ticket listed"))
}

pub async fn create_tickets<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(seller_id): AuthUser,
    Json(input): Json<CreateTickets>,
) -> AppResult<Response> {
    let tickets = state.marketplace.create_tickets(seller_id, input).await?;
    Ok(created(tickets, "Tickets listed"))
}
