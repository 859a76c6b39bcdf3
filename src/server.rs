use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::session;
use crate::config::{App, Config};
use crate::state::AppState;
use crate::wiki::store::EntryStore;
use crate::{commerce, db, network, routes, wiki};

/// Open the storage `app` needs and assemble its router, with the embedded
/// assets and request tracing on every route.
pub fn build_router(app: App, config: Config) -> anyhow::Result<Router> {
    let router = match app {
        App::Commerce => commerce::router(open_database(app, config)?),
        App::Network => network::router(open_database(app, config)?),
        App::Wiki => wiki::router(open_entries(&config)?),
    };

    Ok(router
        .merge(routes::assets::router())
        .layer(TraceLayer::new_for_http()))
}

fn open_database(app: App, config: Config) -> anyhow::Result<AppState> {
    let db_path = config.db_path();
    tracing::info!("Database: {}", db_path.display());

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool, app)?;

    let purged = session::purge_expired(&pool)?;
    if purged > 0 {
        tracing::info!("Removed {} expired sessions", purged);
    }

    Ok(AppState::new(app, pool, config))
}

fn open_entries(config: &Config) -> anyhow::Result<EntryStore> {
    let entries = EntryStore::new(config.entries_path());
    entries.ensure_dir()?;
    tracing::info!("Wiki entries: {}", entries.dir().display());
    Ok(entries)
}
