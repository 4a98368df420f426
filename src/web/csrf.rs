//! Cross-site request forgery protection for form posts.
//!
//! Every visitor gets a random token in the `tari_csrf` cookie. Pages embed
//! the same token in a hidden `csrf_token` field, and state-changing
//! handlers compare the two. A forged cross-site post cannot read the
//! cookie, so it cannot supply a matching field.

use super::session::read_cookie;
use crate::auth;
use crate::error::{AppError, Result};
use axum::extract::{FromRequestParts, Request};
use axum::http::HeaderValue;
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;
use std::convert::Infallible;
use tracing::{error, warn};

pub const CSRF_COOKIE: &str = "tari_csrf";
pub const CSRF_FIELD: &str = "csrf_token";

/// The token of the current request, as issued by [`issue`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsrfToken(pub String);

impl CsrfToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accept `submitted` only if it matches this request's token.
    pub fn verify(&self, submitted: &str) -> Result<()> {
        if !self.0.is_empty() && same_bytes(self.0.as_bytes(), submitted.trim().as_bytes()) {
            return Ok(());
        }
        warn!("Rejected a form post with a missing or stale CSRF token");
        Err(AppError::Forbidden("CSRF verification failed.".into()))
    }
}

fn same_bytes(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn well_formed(token: &str) -> bool {
    !token.is_empty() && token.len() <= 128 && token.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Middleware that hands every request a token, reusing the visitor's
/// cookie when it holds one and setting a fresh cookie otherwise.
pub async fn issue(mut request: Request, next: Next) -> Response {
    let existing = read_cookie(request.headers(), CSRF_COOKIE).filter(|t| well_formed(t));
    let fresh = existing.is_none();
    let token = match existing {
        Some(token) => token,
        None => match auth::new_session_token() {
            Ok(token) => token,
            Err(e) => {
                error!("Could not generate a CSRF token: {e}");
                String::new()
            }
        },
    };
    request.extensions_mut().insert(CsrfToken(token.clone()));

    let mut response = next.run(request).await;
    if fresh && !token.is_empty() {
        let cookie = format!("{CSRF_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

impl<S: Send + Sync> FromRequestParts<S> for CsrfToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        // Outside the middleware nothing was issued, so nothing verifies
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_default())
    }
}

/// Body of the admin forms that carry nothing but the token.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CsrfForm {
    pub csrf_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{StatusCode, header::COOKIE};
    use axum::routing::get;
    use tower::ServiceExt;

    async fn echo(token: CsrfToken) -> String {
        token.0
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(echo))
            .layer(axum::middleware::from_fn(issue))
    }

    async fn text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn first_visit_gets_a_cookie() {
        let response = app()
            .oneshot(axum::http::Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
        let token = text(response).await;
        assert_eq!(token.len(), 64);
        assert!(cookie.starts_with(&format!("tari_csrf={token};")));
    }

    #[tokio::test]
    async fn existing_cookie_is_reused() {
        let request = axum::http::Request::get("/")
            .header(COOKIE, "tari_csrf=abc123")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(text(response).await, "abc123");
    }

    #[tokio::test]
    async fn malformed_cookie_is_replaced() {
        let request = axum::http::Request::get("/")
            .header(COOKIE, "tari_csrf=\"><script>")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert!(response.headers().get(SET_COOKIE).is_some());
        assert_eq!(text(response).await.len(), 64);
    }

    #[test]
    fn verify_requires_exact_match() {
        let token = CsrfToken("abc123".into());
        assert!(token.verify("abc123").is_ok());
        assert!(matches!(token.verify("abc124"), Err(AppError::Forbidden(_))));
        assert!(token.verify("").is_err());
        assert!(token.verify("abc1234").is_err());
    }

    #[test]
    fn missing_token_never_verifies() {
        assert!(CsrfToken::default().verify("").is_err());
    }
}
