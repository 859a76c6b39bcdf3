// Auction rules: pure functions over listing snapshots, no I/O
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::db::RepositoryError;

pub const DEFAULT_IMAGE: &str = "https://placehold.co/600x400?text=No+image";

const ITEM_MAX: usize = 64;
const DESCRIPTION_MAX: usize = 255;
const IMAGE_MAX: usize = 300;

/// An amount of money held as whole cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Please enter a valid amount.")]
    Invalid,

    #[error("The amount must be greater than zero.")]
    NotPositive,

    #[error("The amount is too large.")]
    TooLarge,
}

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Parse user input, rounding to two decimal places (midpoint away from
    /// zero). Only strictly positive amounts are accepted.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        let raw = input.trim().trim_start_matches('$').replace(',', "");
        let value = Decimal::from_str(&raw).map_err(|_| MoneyError::Invalid)?;
        let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if rounded <= Decimal::ZERO {
            return Err(MoneyError::NotPositive);
        }
        let cents = rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|c| c.to_i64())
            .ok_or(MoneyError::TooLarge)?;
        Ok(Self(cents))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_decimal())
    }
}

/// The fields of a listing that bidding, closing and watching depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingState {
    pub id: i64,
    pub seller_id: i64,
    pub price: Money,
    pub proposed_price: Option<Money>,
    pub active: bool,
    pub winner_id: Option<i64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BidRejection {
    #[error("This auction is closed.")]
    Closed,

    #[error("You cannot bid on your own listing.")]
    OwnListing,

    #[error("Your bid must be higher than the current price of ${current}.")]
    TooLow { current: Money },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CloseRejection {
    #[error("Only the seller can close this auction.")]
    NotSeller,

    #[error("This auction is already closed.")]
    AlreadyClosed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatchRejection {
    #[error("You cannot watch a closed auction.")]
    Closed,
}

impl ListingState {
    /// The price a new bid has to beat.
    pub fn current_price(&self) -> Money {
        self.proposed_price.unwrap_or(self.price)
    }

    pub fn evaluate_bid(&self, bidder_id: i64, amount: Money) -> Result<(), BidRejection> {
        if !self.active {
            return Err(BidRejection::Closed);
        }
        if bidder_id == self.seller_id {
            return Err(BidRejection::OwnListing);
        }
        let current = self.current_price();
        if amount <= current {
            return Err(BidRejection::TooLow { current });
        }
        Ok(())
    }

    pub fn evaluate_close(&self, requester_id: i64) -> Result<(), CloseRejection> {
        if requester_id != self.seller_id {
            return Err(CloseRejection::NotSeller);
        }
        if !self.active {
            return Err(CloseRejection::AlreadyClosed);
        }
        Ok(())
    }

    pub fn evaluate_watch(&self) -> Result<(), WatchRejection> {
        if self.active {
            Ok(())
        } else {
            Err(WatchRejection::Closed)
        }
    }
}

/// Failure of a state-changing auction command.
#[derive(Debug, Error)]
pub enum CommandError<R> {
    #[error("{0}")]
    Rejected(R),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type BidError = CommandError<BidRejection>;
pub type CloseError = CommandError<CloseRejection>;
pub type WatchError = CommandError<WatchRejection>;

impl From<BidRejection> for BidError {
    fn from(r: BidRejection) -> Self {
        CommandError::Rejected(r)
    }
}

impl From<CloseRejection> for CloseError {
    fn from(r: CloseRejection) -> Self {
        CommandError::Rejected(r)
    }
}

impl From<WatchRejection> for WatchError {
    fn from(r: WatchRejection) -> Self {
        CommandError::Rejected(r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Added,
    AlreadyPresent,
    Removed,
    NotPresent,
}

impl WatchOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            WatchOutcome::Added => "Added to your watchlist.",
            WatchOutcome::AlreadyPresent => "This listing is already in your watchlist.",
            WatchOutcome::Removed => "Removed from your watchlist.",
            WatchOutcome::NotPresent => "This listing is not in your watchlist.",
        }
    }

    pub fn changed(&self) -> bool {
        matches!(self, WatchOutcome::Added | WatchOutcome::Removed)
    }
}

/// Result of a successful close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Closing {
    pub listing_id: i64,
    pub winner: Option<String>,
    pub final_price: Money,
}

// --- Read models ---

#[derive(Debug, Clone)]
pub struct Listing {
    pub id: i64,
    pub seller_id: i64,
    pub seller: String,
    pub item: String,
    pub description: String,
    pub image: String,
    pub category: Option<String>,
    pub price: Money,
    pub proposed_price: Option<Money>,
    pub active: bool,
    pub winner_id: Option<i64>,
    pub winner: Option<String>,
    pub created_at: String,
}

impl Listing {
    pub fn current_price(&self) -> Money {
        self.proposed_price.unwrap_or(self.price)
    }

    pub fn has_bids(&self) -> bool {
        self.proposed_price.is_some()
    }

    pub fn category_name(&self) -> &str {
        self.category.as_deref().unwrap_or(crate::db::DEFAULT_CATEGORY)
    }

    pub fn listed_on(&self) -> String {
        crate::time::format_timestamp(&self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bid {
    pub id: i64,
    pub listing_id: i64,
    pub bidder_id: i64,
    pub bidder: String,
    pub offer: Money,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    pub writer: String,
    pub text: String,
    pub created_at: String,
}

impl Comment {
    pub fn posted(&self) -> String {
        crate::time::parse_and_format_relative(&self.created_at)
    }
}

#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
    pub active_listings: i64,
}

// --- Listing creation ---

#[derive(Debug, Default, Deserialize)]
pub struct ListingForm {
    #[serde(default)]
    pub item: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewListing {
    pub item: String,
    pub description: String,
    pub price: Money,
    pub image: String,
    pub category: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingFormError {
    #[error("The item name is required and must be at most 64 characters.")]
    Item,

    #[error("The description is required and must be at most 255 characters.")]
    Description,

    #[error("Starting price: {0}")]
    Price(MoneyError),

    #[error("The image must be an http(s) URL of at most 300 characters.")]
    Image,
}

impl ListingForm {
    pub fn validate(&self) -> Result<NewListing, ListingFormError> {
        let item = self.item.trim();
        if item.is_empty() || item.chars().count() > ITEM_MAX {
            return Err(ListingFormError::Item);
        }

        let description = self.description.trim();
        if description.is_empty() || description.chars().count() > DESCRIPTION_MAX {
            return Err(ListingFormError::Description);
        }

        let price = Money::parse(&self.price).map_err(ListingFormError::Price)?;

        let image = self.image.trim();
        let image = if image.is_empty() {
            DEFAULT_IMAGE.to_string()
        } else if (image.starts_with("http://") || image.starts_with("https://"))
            && image.len() <= IMAGE_MAX
        {
            image.to_string()
        } else {
            return Err(ListingFormError::Image);
        };

        let category = Some(self.category.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(NewListing {
            item: item.to_string(),
            description: description.to_string(),
            price,
            image,
            category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(price: i64, proposed: Option<i64>, active: bool) -> ListingState {
        ListingState {
            id: 1,
            seller_id: 10,
            price: Money::from_cents(price),
            proposed_price: proposed.map(Money::from_cents),
            active,
            winner_id: None,
        }
    }

    #[test]
    fn money_parses_and_rounds_to_cents() {
        assert_eq!(Money::parse("12").unwrap().cents(), 1200);
        assert_eq!(Money::parse("12.5").unwrap().cents(), 1250);
        assert_eq!(Money::parse(" $1,234.567 ").unwrap().cents(), 123457);
        assert_eq!(Money::parse("0.005").unwrap().cents(), 1);
    }

    #[test]
    fn money_rejects_bad_input() {
        assert_eq!(Money::parse("abc"), Err(MoneyError::Invalid));
        assert_eq!(Money::parse(""), Err(MoneyError::Invalid));
        assert_eq!(Money::parse("0"), Err(MoneyError::NotPositive));
        assert_eq!(Money::parse("0.004"), Err(MoneyError::NotPositive));
        assert_eq!(Money::parse("-5"), Err(MoneyError::NotPositive));
    }

    #[test]
    fn money_rejects_overflow() {
        assert_eq!(
            Money::parse("79228162514264337593543950335"),
            Err(MoneyError::TooLarge)
        );
        assert_eq!(
            Money::parse("100000000000000000000"),
            Err(MoneyError::TooLarge)
        );
    }

    #[test]
    fn money_displays_two_places() {
        assert_eq!(Money::from_cents(1200).to_string(), "12.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
    }

    #[test]
    fn first_bid_must_beat_starting_price() {
        let state = listing(1000, None, true);
        assert_eq!(
            state.evaluate_bid(20, Money::from_cents(1000)),
            Err(BidRejection::TooLow {
                current: Money::from_cents(1000)
            })
        );
        assert!(state.evaluate_bid(20, Money::from_cents(1001)).is_ok());
    }

    #[test]
    fn later_bids_must_beat_proposed_price() {
        let state = listing(1000, Some(1500), true);
        assert!(state.evaluate_bid(20, Money::from_cents(1200)).is_err());
        assert!(state.evaluate_bid(20, Money::from_cents(1500)).is_err());
        assert!(state.evaluate_bid(20, Money::from_cents(1501)).is_ok());
    }

    #[test]
    fn closed_and_own_listings_refuse_bids() {
        assert_eq!(
            listing(1000, None, false).evaluate_bid(20, Money::from_cents(5000)),
            Err(BidRejection::Closed)
        );
        assert_eq!(
            listing(1000, None, true).evaluate_bid(10, Money::from_cents(5000)),
            Err(BidRejection::OwnListing)
        );
    }

    #[test]
    fn too_low_message_names_current_price() {
        let err = listing(1000, Some(1550), true)
            .evaluate_bid(20, Money::from_cents(100))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Your bid must be higher than the current price of $15.50."
        );
    }

    #[test]
    fn only_seller_closes_once() {
        let open = listing(1000, None, true);
        assert_eq!(open.evaluate_close(99), Err(CloseRejection::NotSeller));
        assert!(open.evaluate_close(10).is_ok());

        let closed = listing(1000, None, false);
        assert_eq!(closed.evaluate_close(10), Err(CloseRejection::AlreadyClosed));
    }

    #[test]
    fn closed_listing_cannot_be_watched() {
        assert!(listing(1000, None, true).evaluate_watch().is_ok());
        assert_eq!(
            listing(1000, None, false).evaluate_watch(),
            Err(WatchRejection::Closed)
        );
    }

    #[test]
    fn listing_form_applies_defaults() {
        let form = ListingForm {
            item: "  Lamp ".into(),
            description: "Brass desk lamp".into(),
            price: "25".into(),
            image: "".into(),
            category: "  ".into(),
        };
        let listing = form.validate().unwrap();
        assert_eq!(listing.item, "Lamp");
        assert_eq!(listing.price.cents(), 2500);
        assert_eq!(listing.image, DEFAULT_IMAGE);
        assert_eq!(listing.category, None);
    }

    #[test]
    fn listing_form_rejects_bad_fields() {
        let valid = || ListingForm {
            item: "Lamp".into(),
            description: "Brass".into(),
            price: "25".into(),
            image: "https://example.com/lamp.jpg".into(),
            category: "Home".into(),
        };
        assert!(valid().validate().is_ok());

        let mut form = valid();
        form.item = "x".repeat(65);
        assert_eq!(form.validate(), Err(ListingFormError::Item));

        let mut form = valid();
        form.description = String::new();
        assert_eq!(form.validate(), Err(ListingFormError::Description));

        let mut form = valid();
        form.price = "free".into();
        assert_eq!(
            form.validate(),
            Err(ListingFormError::Price(MoneyError::Invalid))
        );

        let mut form = valid();
        form.image = "javascript:alert(1)".into();
        assert_eq!(form.validate(), Err(ListingFormError::Image));
    }
}
