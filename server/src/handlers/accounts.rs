use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::engine::{LoginInput, SignupInput, StaffLoginInput, UpdateUserInput};
use crate::store::Store;
use crate::utils::response::{created, success};
use crate::utils::AppResult;
use crate::AppState;

#[derive(Serialize)]
struct TokenPayload {
    token: String,
}

pub async fn signup<S: Store>(
    State(state): State<AppState<S>>,
    Json(input): Json<SignupInput>,
) -> AppResult<Response> {
    let token = state.marketplace.signup(input).await?;
    Ok(created(TokenPayload { token }, "Account created"))
}

pub async fn login<S: Store>(
    State(state): State<AppState<S>>,
    Json(input): Json<LoginInput>,
) -> AppResult<Response> {
    let token = state.marketplace.login(input).await?;
    Ok(success(TokenPayload { token }, "Logged in"))
}

pub async fn staff_login<S: Store>(
    State(state): State<AppState<S>>,
    Json(input): Json<StaffLoginInput>,
) -> AppResult<Response> {
    let token = state.marketplace.staff_login(input).await?;
    Ok(success(TokenPayload { token }, "Staff logged in"))
}

pub async fn me<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Response> {
    let profile = state.marketplace.user(user_id).await?;
    Ok(success(profile, "Profile retrieved"))
}

pub async fn update_me<S: Store>(
    State(state): State<AppState<S>>,
    AuthUser(user_id): AuthUser,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Response> {
    let profile = state.marketplace.update_user(user_id, input).await?;
    Ok(success(profile, "Profile updated"))
}

pub async fn list_users<S: Store>(
    State(state): State<AppState<S>>,
    _caller: AuthUser,
) -> AppResult<Response> {
    let users = state.marketplace.users().await?;
    Ok(success(users, "Users retrieved"))
}

pub async fn get_user<S: Store>(
    State(state): State<AppState<S>>,
    _caller: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Response> {
    let profile = state.marketplace.user(user_id).await?;
    Ok(success(profile, "User retrieved"))
}
