use std::sync::Arc;

use axum::extract::FromRef;

pub mod auth;
pub mod config;
pub mod engine;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;
pub mod utils;

use auth::TokenIssuer;
use engine::Marketplace;
use store::Store;

/// Shared router state.
pub struct AppState<S: Store> {
    pub marketplace: Arc<Marketplace<S>>,
}

impl<S: Store> AppState<S> {
    pub fn new(marketplace: Marketplace<S>) -> Self {
        Self {
            marketplace: Arc::new(marketplace),
        }
    }
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            marketplace: Arc::clone(&self.marketplace),
        }
    }
}

impl<S: Store> FromRef<AppState<S>> for TokenIssuer {
    fn from_ref(state: &AppState<S>) -> Self {
        state.marketplace.tokens().clone()
    }
}
