use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pagination::Page;

/// Longest post or comment body, in characters.
pub const CONTENT_MAX: usize = 500;

/// A post as the feed API returns it. The viewer-dependent flags are false
/// for anonymous viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    pub id: i64,
    pub user: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub content: String,
    pub created: String,
    pub updated: String,
    pub likes: i64,
    pub comments: i64,
    pub liked: bool,
    pub followed: bool,
    pub is_author: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub user: String,
    #[serde(rename = "postId")]
    pub post_id: i64,
    pub content: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub followers: i64,
    pub following: i64,
    pub posts: i64,
    pub viewer_follows: bool,
}

/// Which posts a feed query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    All,
    /// Posts by the users this user follows.
    Following(i64),
    Author(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Liked,
    Unliked,
}

impl LikeToggle {
    pub fn action(&self) -> &'static str {
        match self {
            LikeToggle::Liked => "like",
            LikeToggle::Unliked => "unlike",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LikeToggle::Liked => "Post liked",
            LikeToggle::Unliked => "Post unliked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowToggle {
    Followed,
    Unfollowed,
}

impl FollowToggle {
    pub fn action(&self) -> &'static str {
        match self {
            FollowToggle::Followed => "follow",
            FollowToggle::Unfollowed => "unfollow",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FollowToggle::Followed => "User followed successfully",
            FollowToggle::Unfollowed => "User unfollowed successfully",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error("{0} content is required")]
    Empty(&'static str),

    #[error("{0} content must be at most 500 characters")]
    TooLong(&'static str),
}

/// Request body for creating or editing a post or comment: either a bare
/// JSON string or an object with a `content` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ContentBody {
    Text(String),
    Object { content: String },
}

impl ContentBody {
    pub fn from_json(bytes: &[u8]) -> Option<String> {
        match serde_json::from_slice::<ContentBody>(bytes).ok()? {
            ContentBody::Text(text) => Some(text),
            ContentBody::Object { content } => Some(content),
        }
    }
}

/// Trim and bound-check a post or comment body. `kind` names the thing in
/// error messages ("Post", "Comment").
pub fn validate_content(kind: &'static str, raw: &str) -> Result<String, ContentError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(ContentError::Empty(kind));
    }
    if content.chars().count() > CONTENT_MAX {
        return Err(ContentError::TooLong(kind));
    }
    Ok(content.to_string())
}

#[derive(Debug, Serialize)]
pub struct PostPage {
    pub page: u32,
    pub total_pages: u32,
    pub total_posts: u64,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
    pub posts: Vec<PostView>,
}

impl PostPage {
    pub fn new(page: Page, posts: Vec<PostView>) -> Self {
        Self {
            page: page.number,
            total_pages: page.num_pages,
            total_posts: page.count,
            next_page: page.next_page(),
            previous_page: page.previous_page(),
            posts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentPage {
    pub page: u32,
    pub total_pages: u32,
    pub total_comments: u64,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
    pub comments: Vec<CommentView>,
}

impl CommentPage {
    pub fn new(page: Page, comments: Vec<CommentView>) -> Self {
        Self {
            page: page.number,
            total_pages: page.num_pages,
            total_comments: page.count,
            next_page: page.next_page(),
            previous_page: page.previous_page(),
            comments,
        }
    }
}
