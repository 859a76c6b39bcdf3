// Repository pattern - isolates all feed database side effects
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::Arc;

use crate::db::RepositoryError;
use crate::network::domain::*;
use crate::state::DbPool;
use crate::time::format_timestamp;

/// All social feed database operations. `viewer` is the signed-in user the
/// per-post flags are computed for.
#[async_trait]
pub trait FeedRepository: Send + Sync {
    async fn create_post(&self, user_id: i64, content: &str) -> Result<PostView, RepositoryError>;

    async fn post(&self, id: i64, viewer: Option<i64>) -> Result<Option<PostView>, RepositoryError>;

    async fn count_posts(&self, scope: FeedScope) -> Result<u64, RepositoryError>;

    /// Posts in scope, newest first
    async fn posts(
        &self,
        scope: FeedScope,
        viewer: Option<i64>,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PostView>, RepositoryError>;

    async fn update_post(&self, id: i64, content: &str) -> Result<(), RepositoryError>;

    /// Like if not liked yet, unlike otherwise. Returns the new like count.
    async fn toggle_like(&self, post_id: i64, user_id: i64) -> Result<(LikeToggle, i64), RepositoryError>;

    /// Follow if not following yet, unfollow otherwise. Returns the new
    /// follower count of `followed_id`.
    async fn toggle_follow(&self, user_id: i64, followed_id: i64) -> Result<(FollowToggle, i64), RepositoryError>;

    async fn profile(&self, user_id: i64, viewer: Option<i64>) -> Result<Option<Profile>, RepositoryError>;

    async fn count_comments(&self, post_id: i64) -> Result<u64, RepositoryError>;

    /// Comments on a post, oldest first
    async fn comments(&self, post_id: i64, offset: u64, limit: u32) -> Result<Vec<CommentView>, RepositoryError>;

    async fn add_comment(&self, post_id: i64, user_id: i64, content: &str) -> Result<CommentView, RepositoryError>;
}

pub struct SqliteFeedRepository {
    pool: DbPool,
}

impl SqliteFeedRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// ?1 is always the viewer id (NULL for anonymous)
const POST_SELECT: &str = "SELECT p.id, u.username, p.user_id, p.content, p.created_at, p.updated_at,
            (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id),
            (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
            EXISTS (SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.user_id = ?1),
            EXISTS (SELECT 1 FROM followers f WHERE f.user_id = ?1 AND f.followed_id = p.user_id),
            COALESCE(p.user_id = ?1, 0)
     FROM posts p
     JOIN users u ON u.id = p.user_id";

fn post_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostView> {
    Ok(PostView {
        id: row.get(0)?,
        user: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        created: format_timestamp(&row.get::<_, String>(4)?),
        updated: format_timestamp(&row.get::<_, String>(5)?),
        likes: row.get(6)?,
        comments: row.get(7)?,
        liked: row.get(8)?,
        followed: row.get(9)?,
        is_author: row.get(10)?,
    })
}

fn comment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentView> {
    Ok(CommentView {
        id: row.get(0)?,
        user: row.get(1)?,
        post_id: row.get(2)?,
        content: row.get(3)?,
        date: format_timestamp(&row.get::<_, String>(4)?),
    })
}

/// SQL condition for a scope, with its bound value placed at `?{index}`.
fn scope_filter(scope: FeedScope, index: usize) -> (String, Option<i64>) {
    match scope {
        FeedScope::All => ("1 = 1".to_string(), None),
        FeedScope::Following(user_id) => (
            format!(
                "p.user_id IN (SELECT followed_id FROM followers WHERE user_id = ?{})",
                index
            ),
            Some(user_id),
        ),
        FeedScope::Author(user_id) => (format!("p.user_id = ?{}", index), Some(user_id)),
    }
}

fn viewer_value(viewer: Option<i64>) -> Value {
    viewer.map(Value::Integer).unwrap_or(Value::Null)
}

fn load_post(conn: &Connection, id: i64, viewer: Option<i64>) -> Result<Option<PostView>, RepositoryError> {
    let sql = format!("{} WHERE p.id = ?2", POST_SELECT);
    let post = conn
        .query_row(&sql, params![viewer, id], post_from_row)
        .optional()?;
    Ok(post)
}

fn post_exists(conn: &Connection, id: i64) -> Result<bool, RepositoryError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn user_exists(conn: &Connection, id: i64) -> Result<bool, RepositoryError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn follower_count(conn: &Connection, user_id: i64) -> Result<i64, RepositoryError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM followers WHERE followed_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn post_not_found() -> RepositoryError {
    RepositoryError::NotFound("Post".into())
}

#[async_trait]
impl FeedRepository for SqliteFeedRepository {
    async fn create_post(&self, user_id: i64, content: &str) -> Result<PostView, RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO posts (user_id, content) VALUES (?1, ?2)",
            params![user_id, content],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!("Post {} created by user {}", id, user_id);
        load_post(&conn, id, Some(user_id))?.ok_or_else(post_not_found)
    }

    async fn post(&self, id: i64, viewer: Option<i64>) -> Result<Option<PostView>, RepositoryError> {
        let conn = self.pool.get()?;
        load_post(&conn, id, viewer)
    }

    async fn count_posts(&self, scope: FeedScope) -> Result<u64, RepositoryError> {
        let conn = self.pool.get()?;
        let (filter, value) = scope_filter(scope, 1);
        let sql = format!("SELECT COUNT(*) FROM posts p WHERE {}", filter);
        let count: i64 = conn.query_row(&sql, params_from_iter(value), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn posts(
        &self,
        scope: FeedScope,
        viewer: Option<i64>,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<PostView>, RepositoryError> {
        let conn = self.pool.get()?;
        let (filter, scope_value) = scope_filter(scope, 2);

        let mut values = vec![viewer_value(viewer)];
        if let Some(v) = scope_value {
            values.push(Value::Integer(v));
        }
        let limit_index = values.len() + 1;
        values.push(Value::Integer(i64::from(limit)));
        values.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

        let sql = format!(
            "{} WHERE {} ORDER BY p.created_at DESC, p.id DESC LIMIT ?{} OFFSET ?{}",
            POST_SELECT,
            filter,
            limit_index,
            limit_index + 1
        );
        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(params_from_iter(values), post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn update_post(&self, id: i64, content: &str) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE posts SET content = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![content, id],
        )?;
        if updated == 0 {
            return Err(post_not_found());
        }
        Ok(())
    }

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> Result<(LikeToggle, i64), RepositoryError> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        if !post_exists(&tx, post_id)? {
            return Err(post_not_found());
        }

        let removed = tx.execute(
            "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
        )?;
        let toggle = if removed > 0 {
            LikeToggle::Unliked
        } else {
            tx.execute(
                "INSERT INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                params![post_id, user_id],
            )?;
            LikeToggle::Liked
        };

        let likes: i64 = tx.query_row(
            "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1",
            params![post_id],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok((toggle, likes))
    }

    async fn toggle_follow(&self, user_id: i64, followed_id: i64) -> Result<(FollowToggle, i64), RepositoryError> {
        if user_id == followed_id {
            return Err(RepositoryError::Conflict("users cannot follow themselves".into()));
        }

        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        if !user_exists(&tx, followed_id)? {
            return Err(RepositoryError::NotFound("User".into()));
        }

        let removed = tx.execute(
            "DELETE FROM followers WHERE user_id = ?1 AND followed_id = ?2",
            params![user_id, followed_id],
        )?;
        let toggle = if removed > 0 {
            FollowToggle::Unfollowed
        } else {
            tx.execute(
                "INSERT INTO followers (user_id, followed_id) VALUES (?1, ?2)",
                params![user_id, followed_id],
            )?;
            FollowToggle::Followed
        };

        let followers = follower_count(&tx, followed_id)?;
        tx.commit()?;
        tracing::debug!("User {} {}ed user {}", user_id, toggle.action(), followed_id);
        Ok((toggle, followers))
    }

    async fn profile(&self, user_id: i64, viewer: Option<i64>) -> Result<Option<Profile>, RepositoryError> {
        let conn = self.pool.get()?;
        let profile = conn
            .query_row(
                "SELECT u.id, u.username,
                        (SELECT COUNT(*) FROM followers f WHERE f.followed_id = u.id),
                        (SELECT COUNT(*) FROM followers f WHERE f.user_id = u.id),
                        (SELECT COUNT(*) FROM posts p WHERE p.user_id = u.id),
                        EXISTS (SELECT 1 FROM followers f WHERE f.user_id = ?2 AND f.followed_id = u.id)
                 FROM users u WHERE u.id = ?1",
                params![user_id, viewer],
                |row| {
                    Ok(Profile {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        followers: row.get(2)?,
                        following: row.get(3)?,
                        posts: row.get(4)?,
                        viewer_follows: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    async fn count_comments(&self, post_id: i64) -> Result<u64, RepositoryError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
            params![post_id],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn comments(&self, post_id: i64, offset: u64, limit: u32) -> Result<Vec<CommentView>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, u.username, c.post_id, c.content, c.created_at
             FROM comments c JOIN users u ON u.id = c.user_id
             WHERE c.post_id = ?1
             ORDER BY c.created_at ASC, c.id ASC
             LIMIT ?2 OFFSET ?3",
        )?;
        let comments = stmt
            .query_map(
                params![post_id, limit, i64::try_from(offset).unwrap_or(i64::MAX)],
                comment_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    async fn add_comment(&self, post_id: i64, user_id: i64, content: &str) -> Result<CommentView, RepositoryError> {
        let conn = self.pool.get()?;
        if !post_exists(&conn, post_id)? {
            return Err(post_not_found());
        }
        conn.execute(
            "INSERT INTO comments (user_id, post_id, content) VALUES (?1, ?2, ?3)",
            params![user_id, post_id, content],
        )?;
        let id = conn.last_insert_rowid();
        let comment = conn.query_row(
            "SELECT c.id, u.username, c.post_id, c.content, c.created_at
             FROM comments c JOIN users u ON u.id = c.user_id
             WHERE c.id = ?1",
            params![id],
            comment_from_row,
        )?;
        Ok(comment)
    }
}

/// Type alias for Arc-wrapped repository (for NetworkState)
pub type DynFeedRepository = Arc<dyn FeedRepository>;
