use askama::Template;
use axum::extract::{FromRef, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth::accounts::{self, AccountError, Registration};
use crate::auth::session;
use crate::error::AppResult;
use crate::extractors::{cookie_value, MaybeUser};
use crate::routes::html::{Chrome, Html};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "shared/login.html")]
pub struct LoginTemplate {
    pub chrome: Chrome,
    pub next: String,
    pub message: Option<String>,
}

#[derive(Template)]
#[template(path = "shared/register.html")]
pub struct RegisterTemplate {
    pub chrome: Chrome,
    pub username: String,
    pub email: String,
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: String,
}

/// Login, logout and registration routes for any app whose state exposes
/// an `AppState`.
pub fn router<S>() -> Router<S>
where
    AppState: FromRef<S>,
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout).post(logout))
        .route("/register", get(register_page).post(register))
}

/// Only same-site relative paths are followed after login.
pub fn safe_next(next: &str) -> &str {
    if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
        next
    } else {
        "/"
    }
}

fn signed_in_redirect(state: &AppState, user_id: i64, to: &str) -> AppResult<Response> {
    let token = session::create_session(&state.db, user_id, state.config.auth.session_hours)?;
    let cookie = session::session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, to.to_string()), (header::SET_COOKIE, cookie)],
    )
        .into_response())
}

// -- Login --

async fn login_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NextQuery>,
) -> Response {
    let next = query.next.unwrap_or_else(|| "/".to_string());
    if user.is_some() {
        return Redirect::to(safe_next(&next)).into_response();
    }

    Html(LoginTemplate {
        chrome: Chrome::new(state.app, None, None),
        next,
        message: None,
    })
    .into_response()
}

async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> AppResult<Response> {
    match accounts::authenticate(&state.db, &form.username, &form.password) {
        Ok(user) => {
            tracing::info!("User {} logged in", user.username);
            signed_in_redirect(&state, user.id, safe_next(&form.next))
        }
        Err(AccountError::InvalidCredentials) => Ok(Html(LoginTemplate {
            chrome: Chrome::new(state.app, None, None),
            next: form.next,
            message: Some(AccountError::InvalidCredentials.to_string()),
        })
        .into_response()),
        Err(AccountError::Repository(e)) => Err(e.into()),
        Err(e) => Err(crate::error::AppError::Internal(e.to_string())),
    }
}

// -- Logout --

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;
    if let Some(token) = cookie_value(&headers, cookie_name) {
        session::delete_session(&state.db, token)?;
    }

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, session::clear_session_cookie(cookie_name)),
        ],
    )
        .into_response())
}

// -- Registration --

async fn register_page(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }

    Html(RegisterTemplate {
        chrome: Chrome::new(state.app, None, None),
        username: String::new(),
        email: String::new(),
        message: None,
    })
    .into_response()
}

async fn register(
    State(state): State<AppState>,
    Form(form): Form<Registration>,
) -> AppResult<Response> {
    match accounts::register(&state.db, &form, state.config.auth.bcrypt_cost) {
        Ok(user) => signed_in_redirect(&state, user.id, "/"),
        Err(AccountError::Repository(e)) => Err(e.into()),
        Err(AccountError::Hash(e)) => Err(crate::error::AppError::Internal(e.to_string())),
        Err(e) => Ok(Html(RegisterTemplate {
            chrome: Chrome::new(state.app, None, None),
            username: form.username,
            email: form.email,
            message: Some(e.to_string()),
        })
        .into_response()),
    }
}
