//! Public content pages.

use super::csrf::CsrfToken;
use super::pages::{self, Chrome};
use super::session::{CurrentUser, Flash, found};
use super::render;
use crate::error::{AppError, Result};
use crate::resolve;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::Response;

pub async fn home(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    csrf: CsrfToken,
) -> Result<Response> {
    let popular = resolve::popular_items(&state.store, state.config.popular_items).await?;
    let chrome = chrome(&state, &user, &flash, &csrf);
    Ok(render(&flash, pages::home_page(chrome, &popular, state.media.as_ref())))
}

pub async fn categories(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    csrf: CsrfToken,
) -> Result<Response> {
    let categories = resolve::list_categories(&state.store).await?;
    let chrome = chrome(&state, &user, &flash, &csrf);
    Ok(render(
        &flash,
        pages::categories_page(chrome, &categories, state.media.as_ref()),
    ))
}

pub async fn category(
    State(state): State<AppState>,
    Path(category_slug): Path<String>,
) -> Result<Response> {
    let target = resolve::redirect_to_first_item(&state.store, &category_slug).await?;
    Ok(found(&target, []))
}

pub async fn item(
    State(state): State<AppState>,
    Path((category_slug, item_slug)): Path<(String, String)>,
    user: CurrentUser,
    flash: Flash,
    csrf: CsrfToken,
) -> Result<Response> {
    let view = resolve::view_item(&state.store, &category_slug, &item_slug).await?;
    let chrome = chrome(&state, &user, &flash, &csrf);
    Ok(render(&flash, pages::item_page(chrome, &view, state.media.as_ref())))
}

pub async fn not_found() -> AppError {
    AppError::page_not_found()
}

pub(super) fn chrome<'a>(
    state: &'a AppState,
    user: &'a CurrentUser,
    flash: &'a Flash,
    csrf: &'a CsrfToken,
) -> Chrome<'a> {
    Chrome {
        site_name: &state.config.site_name,
        user: user.user(),
        flash: flash.message(),
        csrf: csrf.as_str(),
    }
}
