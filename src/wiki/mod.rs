//! Encyclopedia of Markdown entries stored as files.

pub mod handlers;
pub mod markdown;
pub mod store;

use std::sync::Arc;

use axum::Router;

use store::EntryStore;

#[derive(Clone)]
pub struct WikiState {
    pub entries: Arc<EntryStore>,
}

pub fn router(entries: EntryStore) -> Router {
    handlers::router().with_state(WikiState {
        entries: Arc::new(entries),
    })
}
