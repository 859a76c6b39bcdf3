use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::commerce::domain::{
    Bid, CategorySummary, CommandError, Comment, Listing, ListingForm, Money,
};
use crate::commerce::CommerceState;
use crate::config::App;
use crate::db::RepositoryError;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, LoginRequired, MaybeUser};
use crate::flash::{flash_redirect, Flash, IncomingFlash};
use crate::routes::html::{error_page, Chrome, Html};

#[derive(Template)]
#[template(path = "commerce/listings.html")]
struct ListingsTemplate {
    chrome: Chrome,
    heading: String,
    empty_message: &'static str,
    listings: Vec<Listing>,
}

#[derive(Template)]
#[template(path = "commerce/listing.html")]
struct ListingTemplate {
    chrome: Chrome,
    listing: Listing,
    bids: Vec<Bid>,
    comments: Vec<Comment>,
    watching: bool,
    is_seller: bool,
    is_winning: bool,
}

#[derive(Template)]
#[template(path = "commerce/create.html")]
struct CreateTemplate {
    chrome: Chrome,
    categories: Vec<CategorySummary>,
    form: ListingForm,
    message: Option<String>,
}

#[derive(Template)]
#[template(path = "commerce/categories.html")]
struct CategoriesTemplate {
    chrome: Chrome,
    categories: Vec<CategorySummary>,
}

#[derive(Template)]
#[template(path = "commerce/myauctions.html")]
struct MyAuctionsTemplate {
    chrome: Chrome,
    selling: Vec<Listing>,
    won: Vec<Listing>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct BidForm {
    #[serde(default)]
    bid: String,
}

#[derive(Deserialize)]
struct CommentForm {
    #[serde(default)]
    comment: String,
}

pub fn router() -> Router<CommerceState> {
    Router::new()
        .route("/", get(index))
        .route("/create", get(create_page).post(create_listing))
        .route("/listing/", get(|| async { Redirect::to("/") }))
        .route("/listing/{id}", get(listing_page))
        .route("/listing/{id}/bid", post(place_bid))
        .route("/listing/{id}/close", post(close_listing))
        .route("/listing/{id}/comment", post(add_comment))
        .route("/listing/{id}/watch", post(watch))
        .route("/listing/{id}/remwatch", post(unwatch))
        .route("/categories", get(categories))
        .route("/categories/{name}", get(category))
        .route("/categories/{name}/", get(category))
        .route("/closed", get(closed))
        .route("/search", get(search))
        .route("/watchlist", get(watchlist))
        .route("/myauctions", get(my_auctions))
        .route("/error", get(error))
}

fn chrome(user: Option<&CurrentUser>, flash: Option<Flash>) -> Chrome {
    Chrome::new(App::Commerce, user, flash)
}

fn listing_url(id: i64) -> String {
    format!("/listing/{}", id)
}

fn missing_listing() -> Response {
    flash_redirect("/error", Flash::error("The listing you are looking for does not exist."))
}

fn listings_page(
    user: Option<&CurrentUser>,
    flash: IncomingFlash,
    heading: impl Into<String>,
    empty_message: &'static str,
    listings: Vec<Listing>,
) -> Response {
    let (flash, clear) = flash.take();
    let page = ListingsTemplate {
        chrome: chrome(user, flash),
        heading: heading.into(),
        empty_message,
        listings,
    };
    (clear, Html(page)).into_response()
}

// -- Browsing --

async fn index(
    State(state): State<CommerceState>,
    MaybeUser(user): MaybeUser,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let listings = state.auctions.active_listings().await?;
    Ok(listings_page(
        user.as_ref(),
        flash,
        "Active Listings",
        "There are no active listings yet.",
        listings,
    ))
}

async fn closed(
    State(state): State<CommerceState>,
    MaybeUser(user): MaybeUser,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let listings = state.auctions.closed_listings().await?;
    Ok(listings_page(
        user.as_ref(),
        flash,
        "Closed Auctions",
        "No auction has been closed yet.",
        listings,
    ))
}

async fn categories(
    State(state): State<CommerceState>,
    MaybeUser(user): MaybeUser,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let categories = state.auctions.categories().await?;
    let (flash, clear) = flash.take();
    Ok((
        clear,
        Html(CategoriesTemplate {
            chrome: chrome(user.as_ref(), flash),
            categories,
        }),
    )
        .into_response())
}

async fn category(
    State(state): State<CommerceState>,
    MaybeUser(user): MaybeUser,
    Path(name): Path<String>,
    flash: IncomingFlash,
) -> AppResult<Response> {
    match state.auctions.listings_in_category(&name).await? {
        Some(listings) => Ok(listings_page(
            user.as_ref(),
            flash,
            name,
            "There are no active listings in this category.",
            listings,
        )),
        None => Ok(error_page(
            StatusCode::NOT_FOUND,
            chrome(user.as_ref(), None),
            format!("The category '{}' does not exist.", name),
        )),
    }
}

async fn search(
    State(state): State<CommerceState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<SearchQuery>,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Redirect::to("/").into_response());
    }

    let listings = state.auctions.search(q).await?;
    Ok(listings_page(
        user.as_ref(),
        flash,
        format!("Search results for '{}'", q),
        "No active listing matches your search.",
        listings,
    ))
}

async fn watchlist(
    State(state): State<CommerceState>,
    LoginRequired(user): LoginRequired,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let listings = state.auctions.watchlist(user.id).await?;
    Ok(listings_page(
        Some(&user),
        flash,
        "Watchlist",
        "You are not watching any listing.",
        listings,
    ))
}

async fn my_auctions(
    State(state): State<CommerceState>,
    LoginRequired(user): LoginRequired,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let selling = state.auctions.listings_by_seller(user.id).await?;
    let won = state.auctions.won_listings(user.id).await?;
    let (flash, clear) = flash.take();
    Ok((
        clear,
        Html(MyAuctionsTemplate {
            chrome: chrome(Some(&user), flash),
            selling,
            won,
        }),
    )
        .into_response())
}

async fn listing_page(
    State(state): State<CommerceState>,
    LoginRequired(user): LoginRequired,
    Path(id): Path<i64>,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let Some(listing) = state.auctions.listing(id).await? else {
        return Ok(missing_listing());
    };

    let bids = state.auctions.bids(id).await?;
    let comments = state.auctions.comments(id).await?;
    let watching = state.auctions.is_watching(user.id, id).await?;
    let is_seller = listing.seller_id == user.id;
    let is_winning = listing.winner_id == Some(user.id);

    let (flash, clear) = flash.take();
    Ok((
        clear,
        Html(ListingTemplate {
            chrome: chrome(Some(&user), flash),
            listing,
            bids,
            comments,
            watching,
            is_seller,
            is_winning,
        }),
    )
        .into_response())
}

async fn error(MaybeUser(user): MaybeUser, flash: IncomingFlash) -> Response {
    let (flash, clear) = flash.take();
    let message = flash
        .map(|f| f.message)
        .unwrap_or_else(|| "Something went wrong.".to_string());
    (
        clear,
        error_page(StatusCode::NOT_FOUND, chrome(user.as_ref(), None), message),
    )
        .into_response()
}

// -- Listing creation --

async fn create_page(
    State(state): State<CommerceState>,
    LoginRequired(user): LoginRequired,
) -> AppResult<Response> {
    let categories = state.auctions.categories().await?;
    Ok(Html(CreateTemplate {
        chrome: chrome(Some(&user), None),
        categories,
        form: ListingForm::default(),
        message: None,
    })
    .into_response())
}

async fn create_listing(
    State(state): State<CommerceState>,
    LoginRequired(user): LoginRequired,
    Form(form): Form<ListingForm>,
) -> AppResult<Response> {
    let rejection = match form.validate() {
        Ok(listing) => match state.auctions.create_listing(user.id, &listing).await {
            Ok(_) => {
                return Ok(flash_redirect(
                    "/",
                    Flash::success("Your listing has been created."),
                ))
            }
            Err(RepositoryError::NotFound(_)) => "Please choose an existing category.".to_string(),
            Err(e) => return Err(e.into()),
        },
        Err(e) => e.to_string(),
    };

    tracing::debug!("Listing form rejected for {}: {}", user.username, rejection);
    let categories = state.auctions.categories().await?;
    let page = Html(CreateTemplate {
        chrome: chrome(Some(&user), None),
        categories,
        form,
        message: Some(rejection),
    });
    Ok((StatusCode::BAD_REQUEST, page).into_response())
}

// -- Commands --

async fn place_bid(
    State(state): State<CommerceState>,
    LoginRequired(user): LoginRequired,
    Path(id): Path<i64>,
    Form(form): Form<BidForm>,
) -> AppResult<Response> {
    let back = listing_url(id);
    let amount = match Money::parse(&form.bid) {
        Ok(amount) => amount,
        Err(e) => return Ok(flash_redirect(&back, Flash::error(e.to_string()))),
    };

    match state.auctions.place_bid(id, user.id, amount).await {
        Ok(bid) => Ok(flash_redirect(
            &back,
            Flash::success(format!("Your bid of ${} has been placed.", bid.offer)),
        )),
        Err(CommandError::Rejected(rejection)) => {
            tracing::debug!("Bid on listing {} by {} rejected: {}", id, user.username, rejection);
            Ok(flash_redirect(&back, Flash::error(rejection.to_string())))
        }
        Err(CommandError::Repository(RepositoryError::NotFound(_))) => Ok(missing_listing()),
        Err(CommandError::Repository(RepositoryError::Conflict(reason))) => {
            tracing::warn!("Bid on listing {} lost a race: {}", id, reason);
            Ok(flash_redirect(
                &back,
                Flash::error("Another bid was placed at the same time. Please try again."),
            ))
        }
        Err(CommandError::Repository(e)) => Err(e.into()),
    }
}

async fn close_listing(
    State(state): State<CommerceState>,
    LoginRequired(user): LoginRequired,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let back = listing_url(id);
    match state.auctions.close_listing(id, user.id).await {
        Ok(closing) => {
            let message = match closing.winner {
                Some(winner) => format!(
                    "The auction is closed. {} won with a bid of ${}.",
                    winner, closing.final_price
                ),
                None => "The auction is closed with no bids.".to_string(),
            };
            Ok(flash_redirect(&back, Flash::success(message)))
        }
        Err(CommandError::Rejected(rejection)) => {
            Ok(flash_redirect(&back, Flash::error(rejection.to_string())))
        }
        Err(CommandError::Repository(RepositoryError::NotFound(_))) => Ok(missing_listing()),
        Err(CommandError::Repository(e)) => Err(e.into()),
    }
}

async fn add_comment(
    State(state): State<CommerceState>,
    LoginRequired(user): LoginRequired,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let back = listing_url(id);
    let text = form.comment.trim();
    if text.is_empty() {
        return Ok(flash_redirect(
            &back,
            Flash::error("You cannot submit an empty comment!"),
        ));
    }

    match state.auctions.add_comment(id, user.id, text).await {
        Ok(_) => Ok(flash_redirect(&back, Flash::success("Your comment has been posted."))),
        Err(RepositoryError::NotFound(_)) => Ok(missing_listing()),
        Err(e) => Err(e.into()),
    }
}

async fn watch(
    State(state): State<CommerceState>,
    LoginRequired(user): LoginRequired,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let back = listing_url(id);
    match state.auctions.watch(user.id, id).await {
        Ok(outcome) if outcome.changed() => {
            Ok(flash_redirect(&back, Flash::success(outcome.message())))
        }
        Ok(outcome) => Ok(flash_redirect(&back, Flash::error(outcome.message()))),
        Err(CommandError::Rejected(rejection)) => {
            Ok(flash_redirect(&back, Flash::error(rejection.to_string())))
        }
        Err(CommandError::Repository(RepositoryError::NotFound(_))) => Ok(missing_listing()),
        Err(CommandError::Repository(e)) => Err(e.into()),
    }
}

async fn unwatch(
    State(state): State<CommerceState>,
    LoginRequired(user): LoginRequired,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let back = listing_url(id);
    match state.auctions.unwatch(user.id, id).await {
        Ok(outcome) if outcome.changed() => {
            Ok(flash_redirect(&back, Flash::success(outcome.message())))
        }
        Ok(outcome) => Ok(flash_redirect(&back, Flash::error(outcome.message()))),
        Err(RepositoryError::NotFound(_)) => Ok(missing_listing()),
        Err(e) => Err(e.into()),
    }
}
