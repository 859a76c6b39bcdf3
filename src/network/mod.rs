//! Social network: posts, likes, follows and comments behind a paginated
//! JSON API, plus the HTML pages that consume it.

pub mod api;
pub mod domain;
pub mod pages;
pub mod repository;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::Router;

use crate::state::AppState;
use repository::{DynFeedRepository, SqliteFeedRepository};

#[derive(Clone)]
pub struct NetworkState {
    pub base: AppState,
    pub feed: DynFeedRepository,
}

impl FromRef<NetworkState> for AppState {
    fn from_ref(state: &NetworkState) -> AppState {
        state.base.clone()
    }
}

impl NetworkState {
    pub fn new(base: AppState) -> Self {
        let feed = Arc::new(SqliteFeedRepository::new(base.db.clone()));
        Self { base, feed }
    }

    pub fn page_size(&self) -> u32 {
        self.base.config.network.page_size
    }
}

pub fn router(base: AppState) -> Router {
    Router::new()
        .merge(api::router())
        .merge(pages::router())
        .merge(crate::auth::handlers::router())
        .with_state(NetworkState::new(base))
}
