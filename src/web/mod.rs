//! HTTP surface: routes, handlers and pages.
//!
//! ```text
//! GET       /                                   home, popular items
//! GET/POST  /register  /login                   accounts
//! GET       /logout
//! GET       /items/                             category cards
//! GET       /items/{category}/                  302 to the first item
//! GET       /items/{category}/{item}/           item page, counts a view
//! GET/POST  /contact/                           contact form
//! GET       /admin/                             staff dashboard
//! GET/POST  /admin/categories/new | {id}/edit   category forms
//! POST      /admin/categories/{id}/delete
//! GET/POST  /admin/items/new | {id}/edit        item forms
//! POST      /admin/items/{id}/delete | reset-views
//! GET       /static/*  /media/*                 local storage only
//! ```
//!
//! Anything else renders the friendly not-found page. Every POST handler
//! checks the form's `csrf_token` against the visitor's `tari_csrf` cookie.

pub mod account;
pub mod admin;
pub mod contact;
pub mod csrf;
pub mod forms;
pub mod pages;
pub mod public;
pub mod session;

use crate::config::StorageBackend;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::SET_COOKIE;
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use maud::Markup;
use session::{FLASH_COOKIE, Flash, expired_cookie};
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Render a page, clearing the flash message it displayed.
pub(crate) fn render(flash: &Flash, markup: Markup) -> Response {
    let mut response = Html(markup.into_string()).into_response();
    if flash.message().is_some() {
        response
            .headers_mut()
            .append(SET_COOKIE, expired_cookie(FLASH_COOKIE));
    }
    response
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(public::home))
        .route(
            "/register",
            get(account::register_form).post(account::register),
        )
        .route("/login", get(account::login_form).post(account::login))
        .route("/logout", get(account::logout))
        .route("/items/", get(public::categories))
        .route("/items/{category_slug}/", get(public::category))
        .route("/items/{category_slug}/{item_slug}/", get(public::item))
        .route("/contact/", get(contact::contact_form).post(contact::submit))
        .route("/admin/", get(admin::dashboard))
        .route(
            "/admin/categories/new",
            get(admin::new_category).post(admin::create_category),
        )
        .route(
            "/admin/categories/{id}/edit",
            get(admin::edit_category).post(admin::update_category),
        )
        .route("/admin/categories/{id}/delete", post(admin::delete_category))
        .route(
            "/admin/items/new",
            get(admin::new_item).post(admin::create_item),
        )
        .route(
            "/admin/items/{id}/edit",
            get(admin::edit_item).post(admin::update_item),
        )
        .route("/admin/items/{id}/delete", post(admin::delete_item))
        .route("/admin/items/{id}/reset-views", post(admin::reset_views));

    let storage = &state.config.storage;
    if storage.backend == StorageBackend::Local {
        app = app
            .nest_service("/static", ServeDir::new(&storage.static_root))
            .nest_service("/media", ServeDir::new(&storage.media_root));
    }

    app.fallback(public::not_found)
        .layer(middleware::from_fn(csrf::issue))
        .layer(DefaultBodyLimit::max(state.config.images.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let address = state.config.server.bind.clone();
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
