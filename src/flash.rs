//! Transient one-shot messages carried in a short-lived cookie: set on a
//! redirect, consumed by the next page render, then cleared.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};

use crate::auth::session::cookie_value;
use crate::error::AppError;

const FLASH_COOKIE: &str = "kampus_flash";

#[derive(Debug, Clone, PartialEq)]
pub struct Flash {
    pub kind: String,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Redirect to `to`, carrying a flash message for the destination page.
pub fn flash_redirect(to: &str, flash: Flash) -> Response {
    (
        [(header::SET_COOKIE, set_cookie(&flash))],
        Redirect::to(to),
    )
        .into_response()
}

pub fn set_cookie(flash: &Flash) -> String {
    // Form-encoding keeps the value inside the cookie-octet alphabet.
    let value = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("kind", &flash.kind)
        .append_pair("msg", &flash.message)
        .finish();
    format!("{}={}; SameSite=Strict; Path=/; Max-Age=60", FLASH_COOKIE, value)
}

pub fn clear_cookie() -> String {
    format!("{}=; SameSite=Strict; Path=/; Max-Age=0", FLASH_COOKIE)
}

fn parse(value: &str) -> Option<Flash> {
    let mut kind = None;
    let mut message = None;
    for (k, v) in url::form_urlencoded::parse(value.as_bytes()) {
        match k.as_ref() {
            "kind" => kind = Some(v.into_owned()),
            "msg" => message = Some(v.into_owned()),
            _ => {}
        }
    }
    Some(Flash {
        kind: kind?,
        message: message?,
    })
}

/// Extractor for the pending flash message, if any. Pages that render it
/// clear the cookie in their response.
pub struct IncomingFlash(pub Option<Flash>);

impl<S: Send + Sync> FromRequestParts<S> for IncomingFlash {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let flash = cookie_value(&parts.headers, FLASH_COOKIE).and_then(parse);
        Ok(IncomingFlash(flash))
    }
}
