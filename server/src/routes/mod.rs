use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{accounts, catalog, health_check, market};
use crate::store::Store;
use crate::AppState;

pub fn create_routes<S: Store>(state: AppState<S>) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/auth/signup", post(accounts::signup::<S>))
        .route("/auth/login", post(accounts::login::<S>))
        .route("/auth/staff-login", post(accounts::staff_login::<S>))
        .route("/me", get(accounts::me::<S>).patch(accounts::update_me::<S>))
        .route("/users", get(accounts::list_users::<S>))
        .route("/users/:id", get(accounts::get_user::<S>))
        .route(
            "/artists",
            get(catalog::list_artists::<S>).post(catalog::create_artist::<S>),
        )
        .route("/artists/:id", get(catalog::get_artist::<S>))
        .route(
            "/concerts",
            get(catalog::list_concerts::<S>).post(catalog::create_concert::<S>),
        )
        .route("/concerts/:id", get(catalog::get_concert::<S>))
        .route(
            "/tickets",
            get(catalog::list_tickets::<S>).post(catalog::create_ticket::<S>),
        )
        .route("/tickets/batch", post(catalog::create_tickets::<S>))
        .route("/tickets/grouped", get(catalog::tickets_grouped::<S>))
        .route("/tickets/buy-bulk", post(market::buy_bulk::<S>))
        .route("/tickets/:id", get(catalog::get_ticket::<S>))
        .route("/tickets/:id/buy", post(market::buy::<S>))
        .route("/tickets/:id/redeem", post(market::redeem::<S>))
        .route("/wallet/deposit", post(market::deposit::<S>))
        .route("/transactions", get(market::list_transactions::<S>))
        .route("/transactions/:id", get(market::get_transaction::<S>))
        .with_state(state);

    create_security_headers_layer()
        .apply(api)
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
}
