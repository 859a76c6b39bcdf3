// Repository pattern - isolates all auction database side effects
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::Arc;

use crate::commerce::domain::*;
use crate::db::{RepositoryError, DEFAULT_CATEGORY};
use crate::state::DbPool;

/// All auction database operations
#[async_trait]
pub trait AuctionRepository: Send + Sync {
    async fn create_listing(&self, seller_id: i64, listing: &NewListing) -> Result<i64, RepositoryError>;

    async fn listing(&self, id: i64) -> Result<Option<Listing>, RepositoryError>;

    /// Active listings, newest first
    async fn active_listings(&self) -> Result<Vec<Listing>, RepositoryError>;

    /// Closed listings, newest first
    async fn closed_listings(&self) -> Result<Vec<Listing>, RepositoryError>;

    /// Active listings in a category; `None` when the category does not exist
    async fn listings_in_category(&self, name: &str) -> Result<Option<Vec<Listing>>, RepositoryError>;

    /// Case-insensitive substring search over item and description of active listings
    async fn search(&self, query: &str) -> Result<Vec<Listing>, RepositoryError>;

    async fn listings_by_seller(&self, seller_id: i64) -> Result<Vec<Listing>, RepositoryError>;

    async fn won_listings(&self, user_id: i64) -> Result<Vec<Listing>, RepositoryError>;

    async fn categories(&self) -> Result<Vec<CategorySummary>, RepositoryError>;

    /// Serialized compare-and-set of the listing's price and winner plus an
    /// appended bid row, all in one transaction.
    async fn place_bid(&self, listing_id: i64, bidder_id: i64, amount: Money) -> Result<Bid, BidError>;

    async fn bids(&self, listing_id: i64) -> Result<Vec<Bid>, RepositoryError>;

    async fn close_listing(&self, listing_id: i64, requester_id: i64) -> Result<Closing, CloseError>;

    async fn comments(&self, listing_id: i64) -> Result<Vec<Comment>, RepositoryError>;

    async fn add_comment(&self, listing_id: i64, writer_id: i64, text: &str) -> Result<i64, RepositoryError>;

    async fn watch(&self, user_id: i64, listing_id: i64) -> Result<WatchOutcome, WatchError>;

    async fn unwatch(&self, user_id: i64, listing_id: i64) -> Result<WatchOutcome, RepositoryError>;

    async fn is_watching(&self, user_id: i64, listing_id: i64) -> Result<bool, RepositoryError>;

    async fn watchlist(&self, user_id: i64) -> Result<Vec<Listing>, RepositoryError>;
}

/// SQLite implementation
pub struct SqliteAuctionRepository {
    pool: DbPool,
}

impl SqliteAuctionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const LISTING_SELECT: &str = "SELECT l.id, l.seller_id, s.username, l.item, l.description, l.image,
            c.name, l.price_cents, l.proposed_price_cents, l.active, l.winner_id, w.username,
            l.created_at
     FROM listings l
     JOIN users s ON s.id = l.seller_id
     LEFT JOIN categories c ON c.id = l.category_id
     LEFT JOIN users w ON w.id = l.winner_id";

const NEWEST_FIRST: &str = "ORDER BY l.created_at DESC, l.id DESC";

fn listing_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Listing> {
    Ok(Listing {
        id: row.get(0)?,
        seller_id: row.get(1)?,
        seller: row.get(2)?,
        item: row.get(3)?,
        description: row.get(4)?,
        image: row
            .get::<_, Option<String>>(5)?
            .unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
        category: row.get(6)?,
        price: Money::from_cents(row.get(7)?),
        proposed_price: row.get::<_, Option<i64>>(8)?.map(Money::from_cents),
        active: row.get(9)?,
        winner_id: row.get(10)?,
        winner: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn query_listings(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Listing>, RepositoryError> {
    let sql = format!("{} WHERE {} {}", LISTING_SELECT, filter, NEWEST_FIRST);
    let mut stmt = conn.prepare(&sql)?;
    let listings = stmt
        .query_map(params, listing_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(listings)
}

fn load_state(conn: &Connection, listing_id: i64) -> Result<Option<ListingState>, RepositoryError> {
    let state = conn
        .query_row(
            "SELECT id, seller_id, price_cents, proposed_price_cents, active, winner_id
             FROM listings WHERE id = ?1",
            params![listing_id],
            |row| {
                Ok(ListingState {
                    id: row.get(0)?,
                    seller_id: row.get(1)?,
                    price: Money::from_cents(row.get(2)?),
                    proposed_price: row.get::<_, Option<i64>>(3)?.map(Money::from_cents),
                    active: row.get(4)?,
                    winner_id: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(state)
}

fn listing_not_found() -> RepositoryError {
    RepositoryError::NotFound("Listing".into())
}

/// Escape LIKE wildcards so user input matches literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl AuctionRepository for SqliteAuctionRepository {
    async fn create_listing(&self, seller_id: i64, listing: &NewListing) -> Result<i64, RepositoryError> {
        let conn = self.pool.get()?;
        let category_name = listing.category.as_deref().unwrap_or(DEFAULT_CATEGORY);
        let category_id: i64 = conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?1",
                params![category_name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| RepositoryError::NotFound(format!("Category '{}'", category_name)))?;

        conn.execute(
            "INSERT INTO listings (seller_id, item, price_cents, description, image, category_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                seller_id,
                listing.item,
                listing.price.cents(),
                listing.description,
                listing.image,
                category_id
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::info!("Listing {} '{}' created by user {}", id, listing.item, seller_id);
        Ok(id)
    }

    async fn listing(&self, id: i64) -> Result<Option<Listing>, RepositoryError> {
        let conn = self.pool.get()?;
        let sql = format!("{} WHERE l.id = ?1", LISTING_SELECT);
        let listing = conn.query_row(&sql, params![id], listing_from_row).optional()?;
        Ok(listing)
    }

    async fn active_listings(&self) -> Result<Vec<Listing>, RepositoryError> {
        let conn = self.pool.get()?;
        query_listings(&conn, "l.active = 1", [])
    }

    async fn closed_listings(&self) -> Result<Vec<Listing>, RepositoryError> {
        let conn = self.pool.get()?;
        query_listings(&conn, "l.active = 0", [])
    }

    async fn listings_in_category(&self, name: &str) -> Result<Option<Vec<Listing>>, RepositoryError> {
        let conn = self.pool.get()?;
        let category_id: Option<i64> = conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        match category_id {
            Some(id) => Ok(Some(query_listings(
                &conn,
                "l.active = 1 AND l.category_id = ?1",
                params![id],
            )?)),
            None => Ok(None),
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<Listing>, RepositoryError> {
        let conn = self.pool.get()?;
        // SQLite LIKE is case-insensitive for ASCII
        query_listings(
            &conn,
            "l.active = 1 AND (l.item LIKE ?1 ESCAPE '\\' OR l.description LIKE ?1 ESCAPE '\\')",
            params![like_pattern(query.trim())],
        )
    }

    async fn listings_by_seller(&self, seller_id: i64) -> Result<Vec<Listing>, RepositoryError> {
        let conn = self.pool.get()?;
        query_listings(&conn, "l.seller_id = ?1", params![seller_id])
    }

    async fn won_listings(&self, user_id: i64) -> Result<Vec<Listing>, RepositoryError> {
        let conn = self.pool.get()?;
        query_listings(&conn, "l.active = 0 AND l.winner_id = ?1", params![user_id])
    }

    async fn categories(&self) -> Result<Vec<CategorySummary>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, c.name,
                    (SELECT COUNT(*) FROM listings l WHERE l.category_id = c.id AND l.active = 1)
             FROM categories c
             ORDER BY c.name",
        )?;
        let categories = stmt
            .query_map([], |row| {
                Ok(CategorySummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    active_listings: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    async fn place_bid(&self, listing_id: i64, bidder_id: i64, amount: Money) -> Result<Bid, BidError> {
        let mut conn = self.pool.get().map_err(RepositoryError::from)?;

        // IMMEDIATE takes the write lock up front, so bids on the same
        // database serialize instead of racing between read and write.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        let state = load_state(&tx, listing_id)?.ok_or_else(listing_not_found)?;
        state.evaluate_bid(bidder_id, amount)?;

        let updated = tx
            .execute(
                "UPDATE listings SET proposed_price_cents = ?1, winner_id = ?2
                 WHERE id = ?3 AND active = 1
                   AND COALESCE(proposed_price_cents, price_cents) < ?1",
                params![amount.cents(), bidder_id, listing_id],
            )
            .map_err(RepositoryError::from)?;
        if updated != 1 {
            return Err(RepositoryError::Conflict(format!(
                "listing {} changed while the bid was being placed",
                listing_id
            ))
            .into());
        }

        tx.execute(
            "INSERT INTO bids (bidder_id, listing_id, offer_cents) VALUES (?1, ?2, ?3)",
            params![bidder_id, listing_id, amount.cents()],
        )
        .map_err(RepositoryError::from)?;
        let bid_id = tx.last_insert_rowid();

        let bid = tx
            .query_row(
                "SELECT b.id, b.listing_id, b.bidder_id, u.username, b.offer_cents, b.created_at
                 FROM bids b JOIN users u ON u.id = b.bidder_id
                 WHERE b.id = ?1",
                params![bid_id],
                bid_from_row,
            )
            .map_err(RepositoryError::from)?;

        tx.commit().map_err(RepositoryError::from)?;

        tracing::info!(
            "Bid {} of ${} accepted on listing {} from user {}",
            bid.id,
            amount,
            listing_id,
            bidder_id
        );
        Ok(bid)
    }

    async fn bids(&self, listing_id: i64) -> Result<Vec<Bid>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT b.id, b.listing_id, b.bidder_id, u.username, b.offer_cents, b.created_at
             FROM bids b JOIN users u ON u.id = b.bidder_id
             WHERE b.listing_id = ?1
             ORDER BY b.offer_cents DESC, b.id DESC",
        )?;
        let bids = stmt
            .query_map(params![listing_id], bid_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bids)
    }

    async fn close_listing(&self, listing_id: i64, requester_id: i64) -> Result<Closing, CloseError> {
        let mut conn = self.pool.get().map_err(RepositoryError::from)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepositoryError::from)?;

        let state = load_state(&tx, listing_id)?.ok_or_else(listing_not_found)?;
        state.evaluate_close(requester_id)?;

        tx.execute(
            "UPDATE listings SET active = 0 WHERE id = ?1 AND active = 1",
            params![listing_id],
        )
        .map_err(RepositoryError::from)?;

        let winner: Option<String> = match state.winner_id {
            Some(id) => tx
                .query_row(
                    "SELECT username FROM users WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(RepositoryError::from)?,
            None => None,
        };

        tx.commit().map_err(RepositoryError::from)?;

        tracing::info!(
            "Listing {} closed by seller {} (winner: {})",
            listing_id,
            requester_id,
            winner.as_deref().unwrap_or("none")
        );

        Ok(Closing {
            listing_id,
            winner,
            final_price: state.current_price(),
        })
    }

    async fn comments(&self, listing_id: i64) -> Result<Vec<Comment>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT c.id, u.username, c.text, c.created_at
             FROM comments c JOIN users u ON u.id = c.writer_id
             WHERE c.listing_id = ?1
             ORDER BY c.created_at DESC, c.id DESC",
        )?;
        let comments = stmt
            .query_map(params![listing_id], |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    writer: row.get(1)?,
                    text: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    async fn add_comment(&self, listing_id: i64, writer_id: i64, text: &str) -> Result<i64, RepositoryError> {
        let conn = self.pool.get()?;
        if load_state(&conn, listing_id)?.is_none() {
            return Err(listing_not_found());
        }
        conn.execute(
            "INSERT INTO comments (writer_id, listing_id, text) VALUES (?1, ?2, ?3)",
            params![writer_id, listing_id, text],
        )?;
        Ok(conn.last_insert_rowid())
    }

    async fn watch(&self, user_id: i64, listing_id: i64) -> Result<WatchOutcome, WatchError> {
        let conn = self.pool.get().map_err(RepositoryError::from)?;
        let state = load_state(&conn, listing_id)?.ok_or_else(listing_not_found)?;
        state.evaluate_watch()?;

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO watchlist (user_id, listing_id) VALUES (?1, ?2)",
                params![user_id, listing_id],
            )
            .map_err(RepositoryError::from)?;

        Ok(if inserted == 1 {
            WatchOutcome::Added
        } else {
            WatchOutcome::AlreadyPresent
        })
    }

    async fn unwatch(&self, user_id: i64, listing_id: i64) -> Result<WatchOutcome, RepositoryError> {
        let conn = self.pool.get()?;
        if load_state(&conn, listing_id)?.is_none() {
            return Err(listing_not_found());
        }
        let removed = conn.execute(
            "DELETE FROM watchlist WHERE user_id = ?1 AND listing_id = ?2",
            params![user_id, listing_id],
        )?;

        Ok(if removed > 0 {
            WatchOutcome::Removed
        } else {
            WatchOutcome::NotPresent
        })
    }

    async fn is_watching(&self, user_id: i64, listing_id: i64) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let watching: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM watchlist WHERE user_id = ?1 AND listing_id = ?2",
            params![user_id, listing_id],
            |row| row.get(0),
        )?;
        Ok(watching)
    }

    async fn watchlist(&self, user_id: i64) -> Result<Vec<Listing>, RepositoryError> {
        let conn = self.pool.get()?;
        query_listings(
            &conn,
            "l.id IN (SELECT listing_id FROM watchlist WHERE user_id = ?1)",
            params![user_id],
        )
    }
}

fn bid_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bid> {
    Ok(Bid {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        bidder_id: row.get(2)?,
        bidder: row.get(3)?,
        offer: Money::from_cents(row.get(4)?),
        created_at: row.get(5)?,
    })
}

/// Type alias for Arc-wrapped repository (for CommerceState)
pub type DynAuctionRepository = Arc<dyn AuctionRepository>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::App;
    use crate::db;
    use tempfile::TempDir;

    fn create_test_repo() -> (SqliteAuctionRepository, DbPool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = db::create_pool(&temp_dir.path().join("commerce.db")).unwrap();
        db::run_migrations(&pool, App::Commerce).unwrap();
        (SqliteAuctionRepository::new(pool.clone()), pool, temp_dir)
    }

    fn add_user(pool: &DbPool, name: &str) -> i64 {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (username, password_hash) VALUES (?1, 'x')",
            params![name],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn add_category(pool: &DbPool, name: &str) {
        pool.get()
            .unwrap()
            .execute("INSERT INTO categories (name) VALUES (?1)", params![name])
            .unwrap();
    }

    fn new_listing(item: &str, price_cents: i64, category: Option<&str>) -> NewListing {
        NewListing {
            item: item.to_string(),
            description: format!("A fine {}", item.to_lowercase()),
            price: Money::from_cents(price_cents),
            image: DEFAULT_IMAGE.to_string(),
            category: category.map(str::to_string),
        }
    }

    fn bid_count(pool: &DbPool, listing_id: i64) -> i64 {
        pool.get()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM bids WHERE listing_id = ?1",
                params![listing_id],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn listing_defaults_to_uncategorized() {
        let (repo, pool, _tmp) = create_test_repo();
        let seller = add_user(&pool, "seller");
        let id = repo
            .create_listing(seller, &new_listing("Lamp", 1000, None))
            .await
            .unwrap();

        let listing = repo.listing(id).await.unwrap().unwrap();
        assert_eq!(listing.category.as_deref(), Some(DEFAULT_CATEGORY));
        assert_eq!(listing.seller, "seller");
        assert!(listing.active);
        assert!(listing.proposed_price.is_none());
    }

    #[tokio::test]
    async fn unknown_category_is_not_found() {
        let (repo, pool, _tmp) = create_test_repo();
        let seller = add_user(&pool, "seller");
        let err = repo
            .create_listing(seller, &new_listing("Lamp", 1000, Some("Nope")))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn low_bid_is_rejected_without_mutation() {
        let (repo, pool, _tmp) = create_test_repo();
        let seller = add_user(&pool, "seller");
        let bidder = add_user(&pool, "bidder");
        let id = repo
            .create_listing(seller, &new_listing("Lamp", 1000, None))
            .await
            .unwrap();

        let err = repo
            .place_bid(id, bidder, Money::from_cents(900))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Rejected(BidRejection::TooLow { .. })
        ));

        let listing = repo.listing(id).await.unwrap().unwrap();
        assert!(listing.proposed_price.is_none());
        assert!(listing.winner_id.is_none());
        assert_eq!(bid_count(&pool, id), 0);
    }

    #[tokio::test]
    async fn accepted_bid_sets_price_winner_and_appends_one_row() {
        let (repo, pool, _tmp) = create_test_repo();
        let seller = add_user(&pool, "seller");
        let bidder = add_user(&pool, "bidder");
        let id = repo
            .create_listing(seller, &new_listing("Lamp", 1000, None))
            .await
            .unwrap();

        let bid = repo
            .place_bid(id, bidder, Money::from_cents(1250))
            .await
            .unwrap();
        assert_eq!(bid.offer, Money::from_cents(1250));
        assert_eq!(bid.bidder, "bidder");

        let listing = repo.listing(id).await.unwrap().unwrap();
        assert_eq!(listing.proposed_price, Some(Money::from_cents(1250)));
        assert_eq!(listing.winner_id, Some(bidder));
        assert_eq!(listing.winner.as_deref(), Some("bidder"));
        assert_eq!(bid_count(&pool, id), 1);

        // Matching the current proposed price is not enough
        let rival = add_user(&pool, "rival");
        assert!(repo
            .place_bid(id, rival, Money::from_cents(1250))
            .await
            .is_err());
        assert_eq!(bid_count(&pool, id), 1);
    }

    #[tokio::test]
    async fn bid_on_missing_listing_is_not_found() {
        let (repo, pool, _tmp) = create_test_repo();
        let bidder = add_user(&pool, "bidder");
        let err = repo
            .place_bid(999, bidder, Money::from_cents(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::Repository(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn closing_twice_reports_already_closed() {
        let (repo, pool, _tmp) = create_test_repo();
        let seller = add_user(&pool, "seller");
        let bidder = add_user(&pool, "bidder");
        let id = repo
            .create_listing(seller, &new_listing("Lamp", 1000, None))
            .await
            .unwrap();
        repo.place_bid(id, bidder, Money::from_cents(2000))
            .await
            .unwrap();

        let err = repo.close_listing(id, bidder).await.unwrap_err();
        assert!(matches!(
            err,
            CommandError::Rejected(CloseRejection::NotSeller)
        ));
        assert!(repo.listing(id).await.unwrap().unwrap().active);

        let closing = repo.close_listing(id, seller).await.unwrap();
        assert_eq!(closing.winner.as_deref(), Some("bidder"));
        assert_eq!(closing.final_price, Money::from_cents(2000));

        let err = repo.close_listing(id, seller).await.unwrap_err();
        assert!(matches!(
            err,
            CommandError::Rejected(CloseRejection::AlreadyClosed)
        ));
        assert!(!repo.listing(id).await.unwrap().unwrap().active);

        // Closed listings accept no more bids
        let err = repo
            .place_bid(id, bidder, Money::from_cents(9000))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Rejected(BidRejection::Closed)));

        let won = repo.won_listings(bidder).await.unwrap();
        assert_eq!(won.len(), 1);
        assert_eq!(repo.closed_listings().await.unwrap().len(), 1);
        assert!(repo.active_listings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn watchlist_add_is_idempotent_and_remove_reports_absence() {
        let (repo, pool, _tmp) = create_test_repo();
        let seller = add_user(&pool, "seller");
        let user = add_user(&pool, "watcher");
        let id = repo
            .create_listing(seller, &new_listing("Lamp", 1000, None))
            .await
            .unwrap();

        assert_eq!(repo.watch(user, id).await.unwrap(), WatchOutcome::Added);
        assert_eq!(
            repo.watch(user, id).await.unwrap(),
            WatchOutcome::AlreadyPresent
        );
        assert_eq!(repo.watchlist(user).await.unwrap().len(), 1);
        assert!(repo.is_watching(user, id).await.unwrap());

        assert_eq!(repo.unwatch(user, id).await.unwrap(), WatchOutcome::Removed);
        assert_eq!(
            repo.unwatch(user, id).await.unwrap(),
            WatchOutcome::NotPresent
        );
        assert!(repo.watchlist(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_listing_cannot_be_watched() {
        let (repo, pool, _tmp) = create_test_repo();
        let seller = add_user(&pool, "seller");
        let user = add_user(&pool, "watcher");
        let id = repo
            .create_listing(seller, &new_listing("Lamp", 1000, None))
            .await
            .unwrap();
        repo.close_listing(id, seller).await.unwrap();

        let err = repo.watch(user, id).await.unwrap_err();
        assert!(matches!(err, CommandError::Rejected(WatchRejection::Closed)));
    }

    #[tokio::test]
    async fn categories_and_search() {
        let (repo, pool, _tmp) = create_test_repo();
        add_category(&pool, "Home");
        let seller = add_user(&pool, "seller");
        repo.create_listing(seller, &new_listing("Brass Lamp", 1000, Some("Home")))
            .await
            .unwrap();
        repo.create_listing(seller, &new_listing("Bicycle", 5000, None))
            .await
            .unwrap();

        let categories = repo.categories().await.unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Home", DEFAULT_CATEGORY]);
        assert!(categories.iter().all(|c| c.active_listings == 1));

        let home = repo.listings_in_category("Home").await.unwrap().unwrap();
        assert_eq!(home.len(), 1);
        assert!(repo.listings_in_category("Garden").await.unwrap().is_none());

        assert_eq!(repo.search("LAMP").await.unwrap().len(), 1);
        assert_eq!(repo.search("fine").await.unwrap().len(), 2);
        assert!(repo.search("100%").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn comments_are_newest_first() {
        let (repo, pool, _tmp) = create_test_repo();
        let seller = add_user(&pool, "seller");
        let id = repo
            .create_listing(seller, &new_listing("Lamp", 1000, None))
            .await
            .unwrap();
        repo.add_comment(id, seller, "first").await.unwrap();
        repo.add_comment(id, seller, "second").await.unwrap();

        let comments = repo.comments(id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "second");
        assert!(repo.add_comment(999, seller, "orphan").await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bids_never_lose_an_update() {
        let (repo, pool, _tmp) = create_test_repo();
        let seller = add_user(&pool, "seller");
        let id = repo
            .create_listing(seller, &new_listing("Lamp", 100, None))
            .await
            .unwrap();

        let bidders: Vec<i64> = (0..8)
            .map(|i| add_user(&pool, &format!("bidder{}", i)))
            .collect();
        let repo: Arc<SqliteAuctionRepository> = Arc::new(repo);

        let mut handles = Vec::new();
        for (i, bidder) in bidders.iter().copied().enumerate() {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let amount = Money::from_cents(200 + (i as i64) * 100);
                repo.place_bid(id, bidder, amount).await.ok()
            }));
        }

        let mut accepted = Vec::new();
        for handle in handles {
            if let Some(bid) = handle.await.unwrap() {
                accepted.push(bid);
            }
        }

        assert!(!accepted.is_empty());
        let best = accepted.iter().max_by_key(|b| b.offer).unwrap();
        let listing = repo.listing(id).await.unwrap().unwrap();
        assert_eq!(listing.proposed_price, Some(best.offer));
        assert_eq!(listing.winner_id, Some(best.bidder_id));
        assert_eq!(bid_count(&pool, id), accepted.len() as i64);
    }
}
