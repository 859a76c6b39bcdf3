mod common;

use common::{location, TestServer};
use reqwest::{Client, StatusCode};
use triptych::config::App;

async fn page(server: &TestServer, client: &Client, path: &str) -> (StatusCode, String) {
    let response = client.get(server.url(path)).send().await.unwrap();
    let status = response.status();
    (status, response.text().await.unwrap())
}

async fn post_form(
    server: &TestServer,
    client: &Client,
    path: &str,
    form: &[(&str, &str)],
) -> reqwest::Response {
    client.post(server.url(path)).form(form).send().await.unwrap()
}

async fn create_lamp(server: &TestServer, seller: &Client) {
    let response = post_form(
        server,
        seller,
        "/create",
        &[
            ("item", "Brass Lamp"),
            ("description", "A brass desk lamp"),
            ("price", "10"),
            ("image", ""),
            ("category", ""),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn auction_lifecycle() {
    let server = TestServer::spawn(App::Commerce).await;
    let alice = server.signed_in("alice").await;
    let bob = server.signed_in("bob").await;

    create_lamp(&server, &alice).await;
    let (status, body) = page(&server, &alice, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Brass Lamp"));
    assert!(body.contains("Not categorized"));

    // Too low
    let response = post_form(&server, &bob, "/listing/1/bid", &[("bid", "10")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/listing/1");
    let (_, body) = page(&server, &bob, "/listing/1").await;
    assert!(body.contains("Your bid must be higher than the current price of $10.00."));

    // The flash is shown once
    let (_, body) = page(&server, &bob, "/listing/1").await;
    assert!(!body.contains("Your bid must be higher"));

    post_form(&server, &bob, "/listing/1/bid", &[("bid", "12.50")]).await;
    let (_, body) = page(&server, &bob, "/listing/1").await;
    assert!(body.contains("Your bid of $12.50 has been placed."));
    assert!(body.contains("Your bid is the current bid."));

    post_form(&server, &alice, "/listing/1/bid", &[("bid", "20")]).await;
    let (_, body) = page(&server, &alice, "/listing/1").await;
    assert!(body.contains("You cannot bid on your own listing."));

    // Only the seller closes
    post_form(&server, &bob, "/listing/1/close", &[]).await;
    let (_, body) = page(&server, &bob, "/listing/1").await;
    assert!(body.contains("Only the seller can close this auction."));

    post_form(&server, &alice, "/listing/1/close", &[]).await;
    let (_, body) = page(&server, &alice, "/listing/1").await;
    assert!(body.contains("bob won with a bid of $12.50."));

    post_form(&server, &alice, "/listing/1/close", &[]).await;
    let (_, body) = page(&server, &alice, "/listing/1").await;
    assert!(body.contains("This auction is already closed."));

    post_form(&server, &bob, "/listing/1/bid", &[("bid", "50")]).await;
    let (_, body) = page(&server, &bob, "/listing/1").await;
    assert!(body.contains("This auction is closed."));
    assert!(body.contains("You won this auction!"));

    let (_, body) = page(&server, &bob, "/myauctions").await;
    assert!(body.contains("Brass Lamp"));
    let (_, body) = page(&server, &bob, "/closed").await;
    assert!(body.contains("Brass Lamp"));
    let (_, body) = page(&server, &bob, "/").await;
    assert!(!body.contains("Brass Lamp"));
}

#[tokio::test]
async fn invalid_bids_are_reported() {
    let server = TestServer::spawn(App::Commerce).await;
    let alice = server.signed_in("alice").await;
    let bob = server.signed_in("bob").await;
    create_lamp(&server, &alice).await;

    post_form(&server, &bob, "/listing/1/bid", &[("bid", "lots")]).await;
    let (_, body) = page(&server, &bob, "/listing/1").await;
    assert!(body.contains("Please enter a valid amount."));

    let response = post_form(&server, &bob, "/listing/99/bid", &[("bid", "5")]).await;
    assert_eq!(location(&response), "/error");
    let (status, body) = page(&server, &bob, "/error").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("does not exist"));
}

#[tokio::test]
async fn watchlist_and_comments() {
    let server = TestServer::spawn(App::Commerce).await;
    let alice = server.signed_in("alice").await;
    let bob = server.signed_in("bob").await;
    create_lamp(&server, &alice).await;

    post_form(&server, &bob, "/listing/1/watch", &[]).await;
    let (_, body) = page(&server, &bob, "/listing/1").await;
    assert!(body.contains("Added to your watchlist."));

    post_form(&server, &bob, "/listing/1/watch", &[]).await;
    let (_, body) = page(&server, &bob, "/listing/1").await;
    assert!(body.contains("This listing is already in your watchlist."));

    let (_, body) = page(&server, &bob, "/watchlist").await;
    assert!(body.contains("Brass Lamp"));

    post_form(&server, &bob, "/listing/1/remwatch", &[]).await;
    post_form(&server, &bob, "/listing/1/remwatch", &[]).await;
    let (_, body) = page(&server, &bob, "/listing/1").await;
    assert!(body.contains("This listing is not in your watchlist."));

    post_form(&server, &bob, "/listing/1/comment", &[("comment", "   ")]).await;
    let (_, body) = page(&server, &bob, "/listing/1").await;
    assert!(body.contains("You cannot submit an empty comment!"));

    post_form(&server, &bob, "/listing/1/comment", &[("comment", "Still available?")]).await;
    let (_, body) = page(&server, &alice, "/listing/1").await;
    assert!(body.contains("Still available?"));
}

#[tokio::test]
async fn browsing_and_access_control() {
    let server = TestServer::spawn(App::Commerce).await;
    let alice = server.signed_in("alice").await;
    create_lamp(&server, &alice).await;

    let anonymous = server.client();
    let response = anonymous.get(server.url("/listing/1")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?next=%2Flisting%2F1");

    let response = anonymous.get(server.url("/listing/")).send().await.unwrap();
    assert_eq!(location(&response), "/");

    let (status, body) = page(&server, &anonymous, "/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Not categorized"));

    let (status, body) = page(&server, &anonymous, "/categories/Not%20categorized/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Brass Lamp"));

    let (status, _) = page(&server, &anonymous, "/categories/Garden/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = page(&server, &anonymous, "/search?q=LAMP").await;
    assert!(body.contains("Brass Lamp"));
    let (_, body) = page(&server, &anonymous, "/search?q=bicycle").await;
    assert!(!body.contains("Brass Lamp"));

    let response = anonymous.get(server.url("/search?q=+")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn listing_form_errors_rerender() {
    let server = TestServer::spawn(App::Commerce).await;
    let alice = server.signed_in("alice").await;

    let response = post_form(
        &server,
        &alice,
        "/create",
        &[
            ("item", "Lamp"),
            ("description", "Lamp"),
            ("price", "0"),
            ("image", ""),
            ("category", ""),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.text().await.unwrap();
    assert!(body.contains("The amount must be greater than zero."));
}

#[tokio::test]
async fn login_and_logout() {
    let server = TestServer::spawn(App::Commerce).await;
    server.signed_in("alice").await;

    let client = server.client();
    let response = post_form(
        &server,
        &client,
        "/login",
        &[("username", "alice"), ("password", "wrong"), ("next", "/")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Invalid username and"));

    let response = post_form(
        &server,
        &client,
        "/login",
        &[("username", "alice"), ("password", "secret"), ("next", "/watchlist")],
    )
    .await;
    assert_eq!(location(&response), "/watchlist");
    let (status, _) = page(&server, &client, "/watchlist").await;
    assert_eq!(status, StatusCode::OK);

    client.get(server.url("/logout")).send().await.unwrap();
    let response = client.get(server.url("/watchlist")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let other = server.client();
    let response = post_form(
        &server,
        &other,
        "/register",
        &[
            ("username", "alice"),
            ("email", ""),
            ("password", "a"),
            ("confirmation", "a"),
        ],
    )
    .await;
    assert!(response.text().await.unwrap().contains("Username already taken."));
}
