use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::config::App;
use crate::error::AppResult;
use crate::extractors::{LoginRequired, MaybeUser};
use crate::network::domain::Profile;
use crate::network::NetworkState;
use crate::routes::html::{error_page, Chrome, Html};

/// Shell page; posts are loaded by `network.js` from `source`.
#[derive(Template)]
#[template(path = "network/feed.html")]
struct FeedTemplate {
    chrome: Chrome,
    heading: &'static str,
    source: &'static str,
    can_post: bool,
}

#[derive(Template)]
#[template(path = "network/profile.html")]
struct ProfileTemplate {
    chrome: Chrome,
    profile: Profile,
    source: String,
    can_follow: bool,
}

pub fn router() -> Router<NetworkState> {
    Router::new()
        .route("/", get(all_posts))
        .route("/following", get(following))
        .route("/profile/{id}", get(profile))
}

async fn all_posts(MaybeUser(user): MaybeUser) -> impl IntoResponse {
    Html(FeedTemplate {
        can_post: user.is_some(),
        chrome: Chrome::new(App::Network, user.as_ref(), None),
        heading: "All Posts",
        source: "/posts",
    })
}

async fn following(LoginRequired(user): LoginRequired) -> impl IntoResponse {
    Html(FeedTemplate {
        chrome: Chrome::new(App::Network, Some(&user), None),
        heading: "Following",
        source: "/posts/tracked",
        can_post: false,
    })
}

async fn profile(
    State(state): State<NetworkState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let chrome = Chrome::new(App::Network, user.as_ref(), None);
    let Some(profile) = state.feed.profile(id, user.as_ref().map(|u| u.id)).await? else {
        return Ok(error_page(StatusCode::NOT_FOUND, chrome, "User not found."));
    };

    let can_follow = user.as_ref().is_some_and(|u| u.id != profile.id);
    Ok(Html(ProfileTemplate {
        chrome,
        source: format!("/posts/user/{}", profile.id),
        profile,
        can_follow,
    })
    .into_response())
}
