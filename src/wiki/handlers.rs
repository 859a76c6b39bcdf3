use askama::Template;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;

use crate::config::App;
use crate::error::AppResult;
use crate::flash::{flash_redirect, Flash, IncomingFlash};
use crate::routes::html::{error_page, Chrome, Html};
use crate::wiki::markdown;
use crate::wiki::store::{EntryError, SearchOutcome};
use crate::wiki::WikiState;

#[derive(Template)]
#[template(path = "wiki/index.html")]
struct IndexTemplate {
    chrome: Chrome,
    heading: String,
    titles: Vec<String>,
    empty_message: &'static str,
}

#[derive(Template)]
#[template(path = "wiki/entry.html")]
struct EntryTemplate {
    chrome: Chrome,
    title: String,
    body: String,
}

#[derive(Template)]
#[template(path = "wiki/edit.html")]
struct EditTemplate {
    chrome: Chrome,
    heading: String,
    action: String,
    title: String,
    content: String,
    new_page: bool,
    message: Option<String>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct NewPageForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct EditForm {
    #[serde(default)]
    content: String,
}

pub fn router() -> Router<WikiState> {
    Router::new()
        .route("/", get(index))
        .route("/wiki/{title}", get(entry))
        .route("/wiki/{title}/edit", get(edit_page).post(save_edit))
        .route("/search", get(search))
        .route("/new", get(new_page).post(create_page))
        .route("/random", get(random))
}

fn chrome(flash: Option<Flash>) -> Chrome {
    Chrome::new(App::Wiki, None, flash)
}

fn entry_url(title: &str) -> String {
    format!("/wiki/{}", urlencoding::encode(title))
}

fn missing_page(title: &str) -> Response {
    error_page(
        StatusCode::NOT_FOUND,
        chrome(None),
        format!("The page '{}' you are looking for does not exist", title),
    )
}

async fn index(State(state): State<WikiState>, flash: IncomingFlash) -> AppResult<Response> {
    let titles = state.entries.list_entries()?;
    let (flash, clear) = flash.take();
    Ok((
        clear,
        Html(IndexTemplate {
            chrome: chrome(flash),
            heading: "All Pages".to_string(),
            titles,
            empty_message: "The encyclopedia is empty. Create the first page!",
        }),
    )
        .into_response())
}

async fn entry(
    State(state): State<WikiState>,
    Path(title): Path<String>,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let Some(entry) = state.entries.get_entry(&title)? else {
        return Ok(missing_page(&title));
    };

    let (flash, clear) = flash.take();
    Ok((
        clear,
        Html(EntryTemplate {
            chrome: chrome(flash),
            body: markdown::render(&entry.content),
            title: entry.title,
        }),
    )
        .into_response())
}

async fn search(
    State(state): State<WikiState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Response> {
    let q = query.q.trim();
    if q.is_empty() {
        return Ok(Redirect::to("/").into_response());
    }

    match state.entries.search(q)? {
        SearchOutcome::Exact(title) => Ok(Redirect::to(&entry_url(&title)).into_response()),
        SearchOutcome::Partial(titles) => Ok(Html(IndexTemplate {
            chrome: chrome(None),
            heading: format!("Search results for '{}'", q),
            titles,
            empty_message: "No page matches your search.",
        })
        .into_response()),
    }
}

async fn random(State(state): State<WikiState>) -> AppResult<Redirect> {
    Ok(match state.entries.random_title()? {
        Some(title) => Redirect::to(&entry_url(&title)),
        None => Redirect::to("/"),
    })
}

// -- Creating and editing --

fn new_page_form(title: String, content: String, message: Option<String>) -> EditTemplate {
    EditTemplate {
        chrome: chrome(None),
        heading: "Create New Page".to_string(),
        action: "/new".to_string(),
        title,
        content,
        new_page: true,
        message,
    }
}

async fn new_page() -> impl IntoResponse {
    Html(new_page_form(String::new(), String::new(), None))
}

async fn create_page(
    State(state): State<WikiState>,
    Form(form): Form<NewPageForm>,
) -> AppResult<Response> {
    let title = form.title.trim().to_string();
    let rejection = if title.is_empty() {
        Some("Please give the page a title.".to_string())
    } else if form.content.trim().is_empty() {
        Some("Please write some content for the page.".to_string())
    } else {
        None
    };
    if let Some(message) = rejection {
        let page = Html(new_page_form(form.title, form.content, Some(message)));
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    if let Some(existing) = state.entries.find_title(&title)? {
        return Ok(error_page(
            StatusCode::CONFLICT,
            chrome(None),
            format!("The page '{}' already exist!", existing),
        ));
    }

    match state.entries.save_entry(&title, &form.content) {
        Ok(()) => Ok(flash_redirect(
            &entry_url(&title),
            Flash::success("The page has been created."),
        )),
        Err(EntryError::InvalidTitle(_)) => {
            let message = EntryError::InvalidTitle(title).to_string();
            let page = Html(new_page_form(form.title, form.content, Some(message)));
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn edit_page(State(state): State<WikiState>, Path(title): Path<String>) -> AppResult<Response> {
    let Some(entry) = state.entries.get_entry(&title)? else {
        return Ok(missing_page(&title));
    };

    Ok(Html(EditTemplate {
        chrome: chrome(None),
        heading: format!("Edit {}", entry.title),
        action: format!("{}/edit", entry_url(&entry.title)),
        title: entry.title,
        content: entry.content,
        new_page: false,
        message: None,
    })
    .into_response())
}

async fn save_edit(
    State(state): State<WikiState>,
    Path(title): Path<String>,
    Form(form): Form<EditForm>,
) -> AppResult<Response> {
    let Some(stored) = state.entries.find_title(&title)? else {
        return Ok(missing_page(&title));
    };

    state.entries.save_entry(&stored, &form.content)?;
    Ok(flash_redirect(
        &entry_url(&stored),
        Flash::success("The page has been saved."),
    ))
}
