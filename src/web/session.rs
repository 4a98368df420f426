//! Cookie-backed sessions and one-shot flash messages.
//!
//! The session cookie carries an opaque token looked up in the `sessions`
//! table. The flash cookie carries a base64url message that the next page
//! render shows once and clears.

use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;
use crate::store::users;
use axum::extract::{FromRequestParts, OriginalUri};
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use data_encoding::BASE64URL_NOPAD;
use tracing::warn;

pub const SESSION_COOKIE: &str = "tari_session";
pub const FLASH_COOKIE: &str = "tari_flash";

/// Value of cookie `name` from the request headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn cookie(name: &str, value: &str, max_age: Option<u64>) -> HeaderValue {
    let mut header = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(age) = max_age {
        header.push_str(&format!("; Max-Age={age}"));
    }
    // Names and values are ASCII by construction
    HeaderValue::from_str(&header).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Session cookie that the browser drops after `max_age` seconds.
pub fn session_cookie(token: &str, max_age: u64) -> HeaderValue {
    cookie(SESSION_COOKIE, token, Some(max_age))
}

pub fn expired_cookie(name: &str) -> HeaderValue {
    cookie(name, "", Some(0))
}

pub fn flash_cookie(message: &str) -> HeaderValue {
    cookie(FLASH_COOKIE, &BASE64URL_NOPAD.encode(message.as_bytes()), None)
}

/// `302 Found` to `location`, with extra cookies.
pub fn found(location: &str, cookies: impl IntoIterator<Item = HeaderValue>) -> Response {
    let mut response = StatusCode::FOUND.into_response();
    let headers = response.headers_mut();
    match HeaderValue::from_str(location) {
        Ok(value) => {
            headers.insert(LOCATION, value);
        }
        Err(_) => {
            headers.insert(LOCATION, HeaderValue::from_static("/"));
        }
    }
    for cookie in cookies {
        headers.append(SET_COOKIE, cookie);
    }
    response
}

/// Redirect that shows `message` on the next page.
pub fn flash_redirect(location: &str, message: &str) -> Response {
    found(location, [flash_cookie(message)])
}

/// The logged-in user, if any.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }

    pub fn is_staff(&self) -> bool {
        self.0.as_ref().is_some_and(|u| u.is_staff)
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = read_cookie(&parts.headers, SESSION_COOKIE) else {
            return Ok(Self(None));
        };
        let ttl = state.config.server.session_ttl();
        let user = state
            .store
            .call(move |conn| users::user_for_session(conn, &token, ttl))
            .await?;
        Ok(Self(user))
    }
}

/// A logged-in staff account. Anonymous visitors are sent to the login
/// page; other accounts get 403.
#[derive(Debug, Clone)]
pub struct Staff(pub User);

impl FromRequestParts<AppState> for Staff {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;
        match current.0 {
            Some(user) if user.is_staff => Ok(Self(user)),
            Some(user) => {
                warn!("User {} tried to open the admin pages", user.username);
                Err(AppError::Forbidden("Staff only".into()).into_response())
            }
            None => {
                let path = parts
                    .extensions
                    .get::<OriginalUri>()
                    .map(|uri| uri.0.path().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string());
                Err(found(&login_url(&path), []))
            }
        }
    }
}

/// `/login?next=<path>`, with the path percent-encoded.
pub fn login_url(next: &str) -> String {
    let mut encoded = String::with_capacity(next.len());
    for byte in next.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'/' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    format!("/login?next={encoded}")
}

/// Pending flash message, taken from the request cookie.
#[derive(Debug, Clone, Default)]
pub struct Flash(pub Option<String>);

impl Flash {
    pub fn message(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Flash {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let message = read_cookie(&parts.headers, FLASH_COOKIE)
            .and_then(|raw| BASE64URL_NOPAD.decode(raw.as_bytes()).ok())
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .filter(|message| !message.is_empty());
        Ok(Self(message))
    }
}
