pub mod models;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;
use thiserror::Error;

use crate::config::App;
use crate::state::DbPool;

/// Name of the category listings fall back to when none is chosen.
pub const DEFAULT_CATEGORY: &str = "Not categorized";

const COMMERCE_MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial",
    include_str!("../../migrations/commerce/001_initial.sql"),
)];

const NETWORK_MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial",
        include_str!("../../migrations/network/001_initial.sql"),
    ),
    (
        "002_followers",
        include_str!("../../migrations/network/002_followers.sql"),
    ),
];

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// True when `err` is a UNIQUE or PRIMARY KEY constraint failure.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn migrations_for(app: App) -> &'static [(&'static str, &'static str)] {
    match app {
        App::Commerce => COMMERCE_MIGRATIONS,
        App::Network => NETWORK_MIGRATIONS,
        App::Wiki => &[],
    }
}

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )
    });
    let pool = Pool::builder().max_size(8).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool, app: App) -> anyhow::Result<()> {
    let conn = pool.get()?;

    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in migrations_for(app) {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying {} migration: {}", app, name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    if app == App::Commerce {
        conn.execute(
            "INSERT OR IGNORE INTO categories (name) VALUES (?1)",
            params![DEFAULT_CATEGORY],
        )?;
    }

    tracing::info!("Database migrations complete");
    Ok(())
}
