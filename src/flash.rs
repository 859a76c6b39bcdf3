//! One-shot messages carried across a redirect in a short-lived cookie.

use std::convert::Infallible;
use std::fmt;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, IntoResponseParts, Response, ResponseParts};

use crate::extractors::cookie_value;

pub const FLASH_COOKIE: &str = "triptych_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

impl fmt::Display for FlashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashKind::Success => f.write_str("success"),
            FlashKind::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    fn cookie(&self) -> String {
        format!(
            "{}={}:{}; HttpOnly; SameSite=Lax; Path=/; Max-Age=60",
            FLASH_COOKIE,
            self.kind,
            urlencoding::encode(&self.message)
        )
    }

    fn parse(value: &str) -> Option<Self> {
        let (kind, message) = value.split_once(':')?;
        let kind = match kind {
            "success" => FlashKind::Success,
            "error" => FlashKind::Error,
            _ => return None,
        };
        let message = urlencoding::decode(message).ok()?.into_owned();
        Some(Self { kind, message })
    }
}

/// 303 redirect that carries a flash message to the next page.
pub fn flash_redirect(to: &str, flash: Flash) -> Response {
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, to.to_string()),
            (header::SET_COOKIE, flash.cookie()),
        ],
    )
        .into_response()
}

/// The flash message that arrived with this request, if any.
pub struct IncomingFlash(pub Option<Flash>);

impl IncomingFlash {
    /// Consume the message. The returned `ClearFlash` must be part of the
    /// response so the message is shown only once.
    pub fn take(self) -> (Option<Flash>, ClearFlash) {
        let present = self.0.is_some();
        (self.0, ClearFlash(present))
    }
}

impl<S> FromRequestParts<S> for IncomingFlash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(IncomingFlash(
            cookie_value(&parts.headers, FLASH_COOKIE).and_then(Flash::parse),
        ))
    }
}

pub struct ClearFlash(bool);

impl IntoResponseParts for ClearFlash {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if self.0 {
            let clear = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", FLASH_COOKIE);
            if let Ok(value) = HeaderValue::from_str(&clear) {
                res.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        Ok(res)
    }
}
