//! Staff-only management pages for categories and items.
//!
//! Every handler takes a [`Staff`] extractor, so anonymous visitors are sent
//! to the login page and other accounts get 403 before any work is done.
//! Invalid submissions re-render the form with field errors; records looked
//! up by id answer 404 when missing.

use super::csrf::{CSRF_FIELD, CsrfForm, CsrfToken};
use super::forms::MultipartForm;
use super::pages::{self, Chrome, FormValues};
use super::render;
use super::session::{Flash, Staff, flash_redirect};
use crate::content;
use crate::error::{FieldErrors, Result};
use crate::models::{Category, Item, by_name};
use crate::state::AppState;
use crate::store::{categories, items};
use axum::Form;
use axum::extract::{Multipart, Path, State};
use axum::response::Response;

const DASHBOARD: &str = "/admin/";

fn staff_chrome<'a>(
    state: &'a AppState,
    staff: &'a Staff,
    flash: &'a Flash,
    csrf: &'a CsrfToken,
) -> Chrome<'a> {
    Chrome {
        site_name: &state.config.site_name,
        user: Some(&staff.0),
        flash: flash.message(),
        csrf: csrf.as_str(),
    }
}

fn category_values(category: &Category) -> FormValues {
    FormValues::from([
        ("name".to_string(), category.name.clone()),
        ("summary".to_string(), category.summary.clone()),
    ])
}

fn item_values(item: &Item) -> FormValues {
    FormValues::from([
        ("name".to_string(), item.name.clone()),
        ("summary".to_string(), item.summary.clone()),
        ("content".to_string(), item.content.clone()),
        ("category".to_string(), item.category_id.to_string()),
        (
            "published_at".to_string(),
            item.published_at.format("%Y-%m-%dT%H:%M").to_string(),
        ),
    ])
}

async fn all_categories(state: &AppState) -> Result<Vec<Category>> {
    let mut all = state.store.call(|conn| categories::list(conn)).await?;
    all.sort_by(by_name);
    Ok(all)
}

pub async fn dashboard(
    State(state): State<AppState>,
    staff: Staff,
    flash: Flash,
    csrf: CsrfToken,
) -> Result<Response> {
    let (mut category_rows, mut item_rows) = state
        .store
        .call(|conn| {
            let mut counted = Vec::new();
            for category in categories::list(conn)? {
                let count = categories::item_count(conn, category.id)?;
                counted.push((category, count));
            }
            Ok((counted, items::list_all(conn)?))
        })
        .await?;
    category_rows.sort_by(|a, b| by_name(&a.0, &b.0));
    item_rows.sort_by(by_name);

    let listed: Vec<(Category, Item)> = item_rows
        .into_iter()
        .filter_map(|item| {
            category_rows
                .iter()
                .find(|(c, _)| c.id == item.category_id)
                .map(|(c, _)| (c.clone(), item))
        })
        .collect();

    let chrome = staff_chrome(&state, &staff, &flash, &csrf);
    Ok(render(&flash, pages::admin_dashboard(chrome, &category_rows, &listed)))
}

// =============================================================================
// Categories
// =============================================================================

pub async fn new_category(
    State(state): State<AppState>,
    staff: Staff,
    flash: Flash,
    csrf: CsrfToken,
) -> Response {
    let chrome = staff_chrome(&state, &staff, &flash, &csrf);
    render(
        &flash,
        pages::category_form(
            chrome,
            "/admin/categories/new",
            &FormValues::new(),
            None,
            &FieldErrors::new(),
        ),
    )
}

pub async fn create_category(
    State(state): State<AppState>,
    staff: Staff,
    flash: Flash,
    csrf: CsrfToken,
    multipart: Multipart,
) -> Result<Response> {
    save_category_form(state, staff, flash, csrf, None, multipart).await
}

pub async fn edit_category(
    State(state): State<AppState>,
    staff: Staff,
    flash: Flash,
    csrf: CsrfToken,
    Path(id): Path<i64>,
) -> Result<Response> {
    let category = state.store.call(move |conn| categories::get(conn, id)).await?;
    let chrome = staff_chrome(&state, &staff, &flash, &csrf);
    Ok(render(
        &flash,
        pages::category_form(
            chrome,
            &format!("/admin/categories/{id}/edit"),
            &category_values(&category),
            Some(&state.media.url(&category.image)),
            &FieldErrors::new(),
        ),
    ))
}

pub async fn update_category(
    State(state): State<AppState>,
    staff: Staff,
    flash: Flash,
    csrf: CsrfToken,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Response> {
    save_category_form(state, staff, flash, csrf, Some(id), multipart).await
}

async fn save_category_form(
    state: AppState,
    staff: Staff,
    flash: Flash,
    csrf: CsrfToken,
    id: Option<i64>,
    multipart: Multipart,
) -> Result<Response> {
    let existing = match id {
        Some(id) => Some(state.store.call(move |conn| categories::get(conn, id)).await?),
        None => None,
    };
    let form = MultipartForm::read(multipart).await?;
    csrf.verify(&form.text(CSRF_FIELD))?;
    let values = form.fields.clone();

    match content::save_category(&state, id, form.into_category_draft()).await {
        Ok(category) => Ok(flash_redirect(
            DASHBOARD,
            &format!("Saved category {}.", category.name),
        )),
        Err(err) => {
            let Some(errors) = err.field_errors() else {
                return Err(err);
            };
            let action = match id {
                Some(id) => format!("/admin/categories/{id}/edit"),
                None => "/admin/categories/new".to_string(),
            };
            let current = existing.as_ref().map(|c| state.media.url(&c.image));
            let chrome = staff_chrome(&state, &staff, &flash, &csrf);
            Ok(render(
                &flash,
                pages::category_form(chrome, &action, &values, current.as_deref(), &errors),
            ))
        }
    }
}

pub async fn delete_category(
    State(state): State<AppState>,
    _staff: Staff,
    csrf: CsrfToken,
    Path(id): Path<i64>,
    Form(form): Form<CsrfForm>,
) -> Result<Response> {
    csrf.verify(&form.csrf_token)?;
    let (category, moved) = content::delete_category(&state, id).await?;
    Ok(flash_redirect(
        DASHBOARD,
        &format!(
            "Deleted category {}. {moved} item(s) moved to the default category.",
            category.name
        ),
    ))
}

// =============================================================================
// Items
// =============================================================================

pub async fn new_item(
    State(state): State<AppState>,
    staff: Staff,
    flash: Flash,
    csrf: CsrfToken,
) -> Result<Response> {
    let categories = all_categories(&state).await?;
    let chrome = staff_chrome(&state, &staff, &flash, &csrf);
    Ok(render(
        &flash,
        pages::item_form(
            chrome,
            "/admin/items/new",
            &FormValues::new(),
            &categories,
            None,
            &FieldErrors::new(),
        ),
    ))
}

pub async fn create_item(
    State(state): State<AppState>,
    staff: Staff,
    flash: Flash,
    csrf: CsrfToken,
    multipart: Multipart,
) -> Result<Response> {
    save_item_form(state, staff, flash, csrf, None, multipart).await
}

pub async fn edit_item(
    State(state): State<AppState>,
    staff: Staff,
    flash: Flash,
    csrf: CsrfToken,
    Path(id): Path<i64>,
) -> Result<Response> {
    let item = state.store.call(move |conn| items::get(conn, id)).await?;
    let categories = all_categories(&state).await?;
    let chrome = staff_chrome(&state, &staff, &flash, &csrf);
    Ok(render(
        &flash,
        pages::item_form(
            chrome,
            &format!("/admin/items/{id}/edit"),
            &item_values(&item),
            &categories,
            Some(&state.media.url(&item.image_thumbnail)),
            &FieldErrors::new(),
        ),
    ))
}

pub async fn update_item(
    State(state): State<AppState>,
    staff: Staff,
    flash: Flash,
    csrf: CsrfToken,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Response> {
    save_item_form(state, staff, flash, csrf, Some(id), multipart).await
}

async fn save_item_form(
    state: AppState,
    staff: Staff,
    flash: Flash,
    csrf: CsrfToken,
    id: Option<i64>,
    multipart: Multipart,
) -> Result<Response> {
    let existing = match id {
        Some(id) => Some(state.store.call(move |conn| items::get(conn, id)).await?),
        None => None,
    };
    let form = MultipartForm::read(multipart).await?;
    csrf.verify(&form.text(CSRF_FIELD))?;
    let values = form.fields.clone();

    let saved = match form.into_item_draft() {
        Ok(draft) => content::save_item(&state, id, draft).await,
        Err(err) => Err(err),
    };
    match saved {
        Ok(saved) => Ok(flash_redirect(
            DASHBOARD,
            &format!("Saved item {}.", saved.item.name),
        )),
        Err(err) => {
            let Some(errors) = err.field_errors() else {
                return Err(err);
            };
            let action = match id {
                Some(id) => format!("/admin/items/{id}/edit"),
                None => "/admin/items/new".to_string(),
            };
            let categories = all_categories(&state).await?;
            let current = existing
                .as_ref()
                .map(|item| state.media.url(&item.image_thumbnail));
            let chrome = staff_chrome(&state, &staff, &flash, &csrf);
            Ok(render(
                &flash,
                pages::item_form(chrome, &action, &values, &categories, current.as_deref(), &errors),
            ))
        }
    }
}

pub async fn delete_item(
    State(state): State<AppState>,
    _staff: Staff,
    csrf: CsrfToken,
    Path(id): Path<i64>,
    Form(form): Form<CsrfForm>,
) -> Result<Response> {
    csrf.verify(&form.csrf_token)?;
    let item = content::delete_item(&state, id).await?;
    Ok(flash_redirect(DASHBOARD, &format!("Deleted item {}.", item.name)))
}

pub async fn reset_views(
    State(state): State<AppState>,
    _staff: Staff,
    csrf: CsrfToken,
    Path(id): Path<i64>,
    Form(form): Form<CsrfForm>,
) -> Result<Response> {
    csrf.verify(&form.csrf_token)?;
    content::reset_views(&state, id).await?;
    Ok(flash_redirect(DASHBOARD, "View count reset."))
}

