//! One-shot status messages carried across a redirect in a signed cookie.
//!
//! Cookie value: `<hex HMAC-SHA256 of message>.<url-encoded message>`.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::convert::Infallible;

use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const FLASH_COOKIE: &str = "flash";

/// Longest message kept in the cookie. Even fully percent-encoded 4-byte
/// chars stay under the ~4 KB browsers accept for one cookie.
pub const MAX_FLASH_CHARS: usize = 300;

/// Message waiting to be shown on the next rendered page, if any.
#[derive(Debug, Default, Clone)]
pub struct Flash(pub Option<String>);

impl Flash {
    pub fn message(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Render `page`, clearing the cookie if a message was shown.
    pub fn render(self, page: String) -> Response {
        let mut response = Html(page).into_response();
        if self.0.is_some() {
            response
                .headers_mut()
                .append(header::SET_COOKIE, HeaderValue::from_static(CLEAR_COOKIE));
        }
        response
    }
}

const CLEAR_COOKIE: &str = "flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax";

#[async_trait]
impl FromRequestParts<AppState> for Flash {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let message = cookie_value(&parts.headers, FLASH_COOKIE)
            .and_then(|value| verify(&state.config.secret_key, value));
        Ok(Flash(message))
    }
}

/// `303 See Other` to `location`, leaving `message` for the next page.
pub fn redirect_with_flash(secret: &str, location: &str, message: &str) -> Response {
    let mut response = StatusCode::SEE_OTHER.into_response();
    let headers = response.headers_mut();

    if let Ok(loc) = HeaderValue::from_str(location) {
        headers.insert(header::LOCATION, loc);
    }

    let message = truncate_message(message);
    let cookie = sign(secret, &message)
        .map(|signed| format!("{}={}; Path=/; HttpOnly; SameSite=Lax", FLASH_COOKIE, signed))
        .and_then(|cookie| HeaderValue::from_str(&cookie).ok());
    match cookie {
        Some(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        None => tracing::warn!("could not build flash cookie"),
    }

    response
}

fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_FLASH_CHARS) {
        Some((cut, _)) => format!("{}…", &message[..cut]),
        None => message.to_string(),
    }
}

pub fn sign(secret: &str, message: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(message.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    Some(format!("{}.{}", signature, urlencoding::encode(message)))
}

/// The message inside a cookie value, or `None` if it was tampered with.
pub fn verify(secret: &str, value: &str) -> Option<String> {
    let (sig_hex, encoded) = value.split_once('.')?;
    let signature = hex::decode(sig_hex).ok()?;
    let message = urlencoding::decode(encoded).ok()?.into_owned();

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(message.as_bytes());
    mac.verify_slice(&signature).ok()?;
    Some(message)
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
