//! Auction marketplace: listings, bids, comments, watchlist and categories.

pub mod domain;
pub mod handlers;
pub mod repository;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::Router;

use crate::state::AppState;
use repository::{DynAuctionRepository, SqliteAuctionRepository};

#[derive(Clone)]
pub struct CommerceState {
    pub base: AppState,
    pub auctions: DynAuctionRepository,
}

impl FromRef<CommerceState> for AppState {
    fn from_ref(state: &CommerceState) -> AppState {
        state.base.clone()
    }
}

impl CommerceState {
    pub fn new(base: AppState) -> Self {
        let auctions = Arc::new(SqliteAuctionRepository::new(base.db.clone()));
        Self { base, auctions }
    }
}

/// Every commerce route, including login and registration.
pub fn router(base: AppState) -> Router {
    Router::new()
        .merge(handlers::router())
        .merge(crate::auth::handlers::router())
        .with_state(CommerceState::new(base))
}
