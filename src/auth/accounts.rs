use rusqlite::{params, OptionalExtension};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::password::{hash_password, verify_password};
use crate::db::models::User;
use crate::db::{is_unique_violation, RepositoryError};
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Username and password are required.")]
    MissingFields,

    #[error("Passwords must match.")]
    PasswordMismatch,

    #[error("Username already taken.")]
    UsernameTaken,

    #[error("Invalid username and/or password.")]
    InvalidCredentials,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Deserialize)]
pub struct Registration {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
    pub confirmation: String,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Create a user account from a registration form.
pub fn register(pool: &DbPool, form: &Registration, cost: u32) -> Result<User, AccountError> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Err(AccountError::MissingFields);
    }
    if form.password != form.confirmation {
        return Err(AccountError::PasswordMismatch);
    }

    let password_hash = hash_password(&form.password, cost)?;
    let conn = pool.get().map_err(RepositoryError::from)?;

    match conn.execute(
        "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)",
        params![username, form.email.trim(), password_hash],
    ) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Err(AccountError::UsernameTaken),
        Err(e) => return Err(RepositoryError::from(e).into()),
    }

    let id = conn.last_insert_rowid();
    tracing::info!("Registered user {} ({})", username, id);

    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id],
            user_from_row,
        )
        .map_err(RepositoryError::from)?;
    Ok(user)
}

/// Check a username/password pair.
pub fn authenticate(pool: &DbPool, username: &str, password: &str) -> Result<User, AccountError> {
    let user = find_by_username(pool, username.trim())?.ok_or(AccountError::InvalidCredentials)?;
    if !verify_password(password, &user.password_hash) {
        tracing::debug!("Failed login for {}", user.username);
        return Err(AccountError::InvalidCredentials);
    }
    Ok(user)
}

pub fn find_by_username(pool: &DbPool, username: &str) -> Result<Option<User>, RepositoryError> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
            params![username],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}
