use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::config::App;
use crate::extractors::CurrentUser;
use crate::flash::Flash;

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub struct NavLink {
    pub href: String,
    pub label: &'static str,
}

impl NavLink {
    fn new(href: impl Into<String>, label: &'static str) -> Self {
        Self {
            href: href.into(),
            label,
        }
    }
}

/// Page furniture shared by every template: brand, navigation, the signed-in
/// user and any pending flash message.
pub struct Chrome {
    pub brand: &'static str,
    pub links: Vec<NavLink>,
    pub username: Option<String>,
    pub flash: Option<Flash>,
    pub search_action: Option<&'static str>,
}

impl Chrome {
    pub fn new(app: App, user: Option<&CurrentUser>, flash: Option<Flash>) -> Self {
        let mut links = Vec::new();
        let (brand, search_action) = match app {
            App::Commerce => {
                links.push(NavLink::new("/", "Active Listings"));
                links.push(NavLink::new("/categories", "Categories"));
                links.push(NavLink::new("/closed", "Closed Auctions"));
                if user.is_some() {
                    links.push(NavLink::new("/create", "Create Listing"));
                    links.push(NavLink::new("/watchlist", "Watchlist"));
                    links.push(NavLink::new("/myauctions", "My Auctions"));
                }
                ("Auctions", Some("/search"))
            }
            App::Network => {
                links.push(NavLink::new("/", "All Posts"));
                if let Some(user) = user {
                    links.push(NavLink::new(format!("/profile/{}", user.id), "Profile"));
                    links.push(NavLink::new("/following", "Following"));
                }
                ("Network", None)
            }
            App::Wiki => {
                links.push(NavLink::new("/", "Home"));
                links.push(NavLink::new("/new", "Create New Page"));
                links.push(NavLink::new("/random", "Random Page"));
                ("Wiki", Some("/search"))
            }
        };

        // The wiki has no accounts
        if app != App::Wiki {
            if user.is_some() {
                links.push(NavLink::new("/logout", "Log Out"));
            } else {
                links.push(NavLink::new("/login", "Log In"));
                links.push(NavLink::new("/register", "Register"));
            }
        }

        Self {
            brand,
            links,
            username: user.map(|u| u.username.clone()),
            flash,
            search_action,
        }
    }
}

#[derive(Template)]
#[template(path = "shared/error.html")]
pub struct ErrorTemplate {
    pub chrome: Chrome,
    pub message: String,
}

/// Render the error page with the given status.
pub fn error_page(status: StatusCode, chrome: Chrome, message: impl Into<String>) -> Response {
    let page = Html(ErrorTemplate {
        chrome,
        message: message.into(),
    })
    .into_response();
    (status, page).into_response()
}
