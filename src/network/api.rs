use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::RepositoryError;
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiPath, CurrentUser, MaybeUser};
use crate::network::domain::{
    validate_content, CommentPage, ContentBody, FeedScope, PostPage,
};
use crate::network::NetworkState;
use crate::pagination::{parse_page_param, Page, Paginator};

#[derive(Deserialize)]
struct PageQuery {
    page: Option<String>,
}

pub fn router() -> Router<NetworkState> {
    Router::new()
        .route("/auth", get(auth_status))
        .route("/posts", get(all_posts).post(create_post))
        .route("/posts/tracked", get(tracked_posts))
        .route("/posts/user/{id}", get(user_posts))
        .route("/posts/{key}", get(get_post).post(edit_post))
        .route("/posts/{id}/like", post(toggle_like))
        .route("/posts/{id}/comments", get(list_comments).post(add_comment))
        .route("/user/{id}/follow", post(toggle_follow))
}

fn page_of(count: u64, per_page: u32, query: &PageQuery) -> AppResult<Page> {
    Paginator::new(count, per_page)
        .page(parse_page_param(query.page.as_deref()))
        .map_err(|e| AppError::NotFound(e.to_string()))
}

fn content_from(kind: &'static str, body: &Bytes) -> AppResult<String> {
    let raw = ContentBody::from_json(body).unwrap_or_default();
    validate_content(kind, &raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

fn object_missing() -> AppError {
    AppError::NotFound("Object does not exist.".into())
}

async fn feed_page(
    state: &NetworkState,
    scope: FeedScope,
    viewer: Option<&CurrentUser>,
    query: &PageQuery,
) -> AppResult<Json<PostPage>> {
    let count = state.feed.count_posts(scope).await?;
    let page = page_of(count, state.page_size(), query)?;
    let posts = state
        .feed
        .posts(scope, viewer.map(|u| u.id), page.offset, page.limit)
        .await?;
    Ok(Json(PostPage::new(page, posts)))
}

async fn auth_status(MaybeUser(user): MaybeUser) -> Json<Value> {
    Json(json!({
        "is_authenticated": user.is_some(),
        "username": user.map(|u| u.username),
    }))
}

async fn all_posts(
    State(state): State<NetworkState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PostPage>> {
    feed_page(&state, FeedScope::All, user.as_ref(), &query).await
}

async fn tracked_posts(
    State(state): State<NetworkState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PostPage>> {
    let user = user.ok_or_else(AppError::unauthorized)?;
    feed_page(&state, FeedScope::Following(user.id), Some(&user), &query).await
}

async fn user_posts(
    State(state): State<NetworkState>,
    MaybeUser(user): MaybeUser,
    ApiPath(author_id): ApiPath<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PostPage>> {
    if state.feed.profile(author_id, None).await?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }
    feed_page(&state, FeedScope::Author(author_id), user.as_ref(), &query).await
}

async fn create_post(
    State(state): State<NetworkState>,
    user: CurrentUser,
    body: Bytes,
) -> AppResult<Response> {
    let content = content_from("Post", &body)?;
    let post = state.feed.create_post(user.id, &content).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Post created successfully",
            "post": post,
        })),
    )
        .into_response())
}

/// `/posts/{key}` is a post id; any other segment is an unknown feed filter.
async fn get_post(
    State(state): State<NetworkState>,
    MaybeUser(user): MaybeUser,
    ApiPath(key): ApiPath<String>,
) -> AppResult<Json<Value>> {
    let Ok(id) = key.parse::<i64>() else {
        return Err(AppError::NotFound("Page not found".into()));
    };
    let post = state
        .feed
        .post(id, user.map(|u| u.id))
        .await?
        .ok_or_else(object_missing)?;
    Ok(Json(json!({ "post": post })))
}

async fn edit_post(
    State(state): State<NetworkState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let post = state
        .feed
        .post(id, Some(user.id))
        .await?
        .ok_or_else(object_missing)?;
    if !post.is_author {
        tracing::warn!("User {} tried to edit post {} by {}", user.username, id, post.user);
        return Err(AppError::Forbidden("You can only edit your own posts".into()));
    }

    let content = content_from("Post", &body)?;
    state.feed.update_post(id, &content).await?;
    let post = state
        .feed
        .post(id, Some(user.id))
        .await?
        .ok_or_else(object_missing)?;
    Ok(Json(json!({
        "message": "Post updated successfully",
        "post": post,
    })))
}

async fn toggle_like(
    State(state): State<NetworkState>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Value>> {
    let (toggle, likes) = match state.feed.toggle_like(id, user.id).await {
        Ok(result) => result,
        Err(RepositoryError::NotFound(_)) => return Err(object_missing()),
        Err(e) => return Err(e.into()),
    };
    Ok(Json(json!({
        "message": toggle.message(),
        "likesCount": likes,
        "action": toggle.action(),
    })))
}

async fn toggle_follow(
    State(state): State<NetworkState>,
    user: CurrentUser,
    ApiPath(followed_id): ApiPath<i64>,
) -> AppResult<Json<Value>> {
    if followed_id == user.id {
        return Err(AppError::BadRequest("You cannot follow yourself".into()));
    }

    let (toggle, followers) = match state.feed.toggle_follow(user.id, followed_id).await {
        Ok(result) => result,
        Err(RepositoryError::NotFound(_)) => {
            return Err(AppError::NotFound("User not found".into()))
        }
        Err(e) => return Err(e.into()),
    };
    Ok(Json(json!({
        "message": toggle.message(),
        "action": toggle.action(),
        "followers": followers,
    })))
}

async fn list_comments(
    State(state): State<NetworkState>,
    ApiPath(post_id): ApiPath<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<CommentPage>> {
    if state.feed.post(post_id, None).await?.is_none() {
        return Err(object_missing());
    }
    let count = state.feed.count_comments(post_id).await?;
    let page = page_of(count, state.page_size(), &query)?;
    let comments = state
        .feed
        .comments(post_id, page.offset, page.limit)
        .await?;
    Ok(Json(CommentPage::new(page, comments)))
}

async fn add_comment(
    State(state): State<NetworkState>,
    user: CurrentUser,
    ApiPath(post_id): ApiPath<i64>,
    body: Bytes,
) -> AppResult<Response> {
    let content = content_from("Comment", &body)?;
    let comment = match state.feed.add_comment(post_id, user.id, &content).await {
        Ok(comment) => comment,
        Err(RepositoryError::NotFound(_)) => return Err(object_missing()),
        Err(e) => return Err(e.into()),
    };
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Comment added successfully",
            "comment": comment,
        })),
    )
        .into_response())
}
