//! Registration, login and logout.

use super::csrf::CsrfToken;
use super::forms::{LoginForm, NextQuery, RegisterForm};
use super::pages::{self, FormValues};
use super::public::chrome;
use super::render;
use super::session::{
    CurrentUser, Flash, SESSION_COOKIE, expired_cookie, flash_cookie, found,
    read_cookie, session_cookie,
};
use crate::auth::{self, safe_next};
use crate::error::{FieldErrors, Result};
use crate::models::User;
use crate::state::{AppState, State as SiteState};
use crate::store::users;
use axum::Form;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use tracing::{debug, info, warn};

pub const INVALID_LOGIN: &str = "Invalid username or password.";
pub const LOGOUT: &str = "Logged out successfully!";

pub fn signup_message(username: &str) -> String {
    format!("New account created: {username}")
}

pub fn login_message(username: &str) -> String {
    format!("You are now logged in as {username}")
}

/// Start a session for `user` and redirect with a flash message.
async fn start_session(state: &SiteState, user: &User, location: &str, message: &str) -> Result<Response> {
    let token = auth::new_session_token()?;
    let (session_token, user_id) = (token.clone(), user.id);
    let ttl = state.config.server.session_ttl();
    let purged = state
        .store
        .call(move |conn| {
            let purged = users::purge_expired_sessions(conn, ttl)?;
            users::create_session(conn, &session_token, user_id)?;
            Ok(purged)
        })
        .await?;
    if purged > 0 {
        debug!("Dropped {purged} expired sessions");
    }
    let cookie = session_cookie(&token, ttl.num_seconds().unsigned_abs());
    Ok(found(location, [cookie, flash_cookie(message)]))
}

pub async fn register_form(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    csrf: CsrfToken,
) -> Response {
    let chrome = chrome(&state, &user, &flash, &csrf);
    render(&flash, pages::register_page(chrome, &FormValues::new(), &FieldErrors::new()))
}

pub async fn register(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    csrf: CsrfToken,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    csrf.verify(&form.csrf_token)?;
    let mut errors = form.validate();
    let username = form.username.trim().to_string();

    if errors.is_empty() {
        let password = form.password1.clone();
        let hash = tokio::task::spawn_blocking(move || auth::hash_password(&password)).await??;
        let (name, email) = (username.clone(), form.email.trim().to_string());
        let created = state
            .store
            .call(move |conn| {
                if users::find_by_username(conn, &name)?.is_some() {
                    return Ok(None);
                }
                users::create(conn, &name, &email, &hash, false).map(Some)
            })
            .await;
        match created {
            Ok(Some(new_user)) => {
                let message = signup_message(&new_user.username);
                info!("{message}");
                return start_session(&state, &new_user, "/", &message).await;
            }
            Ok(None) | Err(crate::store::StoreError::Conflict { .. }) => {
                errors.add("username", "A user with that username already exists.");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let values = FormValues::from([
        ("username".to_string(), username),
        ("email".to_string(), form.email.clone()),
    ]);
    let chrome = chrome(&state, &user, &flash, &csrf);
    Ok(render(&flash, pages::register_page(chrome, &values, &errors)))
}

pub async fn login_form(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    user: CurrentUser,
    flash: Flash,
    csrf: CsrfToken,
) -> Response {
    let chrome = chrome(&state, &user, &flash, &csrf);
    render(&flash, pages::login_page(chrome, "", query.next.as_deref(), None))
}

pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
    user: CurrentUser,
    flash: Flash,
    csrf: CsrfToken,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    csrf.verify(&form.csrf_token)?;
    let username = form.username.trim().to_string();
    let lookup = username.clone();
    let account = state
        .store
        .call(move |conn| users::find_by_username(conn, &lookup))
        .await?;

    let verified = match account {
        Some(account) => {
            let (password, hash) = (form.password.clone(), account.password_hash.clone());
            let ok = tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
                .await?;
            ok.then_some(account)
        }
        None => None,
    };

    match verified {
        Some(account) => {
            let message = login_message(&account.username);
            info!("{message}");
            let target = safe_next(query.next.as_deref()).to_string();
            if query.next.is_some() {
                info!("Redirecting to {target} after login");
            }
            start_session(&state, &account, &target, &message).await
        }
        None => {
            warn!("Failed login for {username}");
            let chrome = chrome(&state, &user, &flash, &csrf);
            Ok(render(
                &flash,
                pages::login_page(chrome, &username, query.next.as_deref(), Some(INVALID_LOGIN)),
            ))
        }
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if let Some(token) = read_cookie(&headers, SESSION_COOKIE) {
        state
            .store
            .call(move |conn| users::delete_session(conn, &token))
            .await?;
    }
    info!("{LOGOUT}");
    Ok(found(
        "/",
        [expired_cookie(SESSION_COOKIE), flash_cookie(LOGOUT)],
    ))
}

