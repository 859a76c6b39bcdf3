use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::{App, Config};

pub type DbPool = Pool<SqliteConnectionManager>;

/// State shared by the database-backed applications. App-specific states
/// embed it and expose it through `FromRef` so the auth extractors work
/// for every router.
#[derive(Clone)]
pub struct AppState {
    pub app: App,
    pub db: DbPool,
    pub config: Config,
}

impl AppState {
    pub fn new(app: App, db: DbPool, config: Config) -> Self {
        Self { app, db, config }
    }
}
