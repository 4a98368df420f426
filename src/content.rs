//! Saving categories and items.
//!
//! A save runs in four stages:
//!
//! 1. **Validate**: required fields, lengths, a non-empty slug, and name
//!    and slug uniqueness against the store.
//! 2. **Transform**: only when a new image was uploaded. Runs on the
//!    blocking pool. Items keep the original and gain a thumbnail;
//!    categories keep only the processed card image.
//! 3. **Commit**: media are uploaded, then the row is written in one
//!    transaction. If the write fails, the uploaded media are removed again.
//! 4. **Notify**: item creation only. The outcome is logged and returned,
//!    never raised.
//!
//! Stages 1 (field checks) and 2 are pure and live in [`prepare_category`]
//! and [`prepare_item`], so the bulk loader can run them in parallel.

use crate::config::ImagesConfig;
use crate::error::{AppError, FieldErrors, Result};
use crate::imaging::{EncodedImage, ImageBackend, create_thumbnail};
use crate::media::valid_file_name;
use crate::models::{
    Category, CategoryDraft, DEFAULT_CATEGORY_ID, ITEM_SUMMARY_MAX_CHARS, Item, ItemDraft,
};
use crate::notify::{Context, DispatchResult, Recipient, TemplateId};
use crate::slug::slugify;
use crate::state::State;
use crate::store::categories::{self, CategoryRow};
use crate::store::items::{self, ItemRow};
use crate::store::users;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

pub const NAME_MAX_CHARS: usize = 200;
const REQUIRED: &str = "This field is required.";

/// Media to upload for one entity, in storage order.
#[derive(Debug, Clone)]
struct PendingMedia(Vec<EncodedImage>);

#[derive(Debug, Clone)]
pub struct PreparedCategory {
    pub name: String,
    pub summary: String,
    pub slug: String,
    /// Processed card image, if a new one was uploaded.
    pub image: Option<EncodedImage>,
}

#[derive(Debug, Clone)]
pub struct PreparedItem {
    pub name: String,
    pub summary: String,
    pub content: String,
    pub slug: String,
    pub category_id: Option<i64>,
    pub published_at: Option<DateTime<Utc>>,
    /// Original upload and its thumbnail, if a new image was uploaded.
    pub image: Option<(EncodedImage, EncodedImage)>,
}

#[derive(Debug, Clone)]
pub struct SavedItem {
    pub item: Item,
    /// Outcome of the new-item notification; `None` for updates.
    pub notification: Option<DispatchResult>,
}

fn check_name(errors: &mut FieldErrors, name: &str) -> String {
    let slug = slugify(name);
    if name.is_empty() {
        errors.add("name", REQUIRED);
    } else if name.chars().count() > NAME_MAX_CHARS {
        errors.add(
            "name",
            format!("Ensure this value has at most {NAME_MAX_CHARS} characters."),
        );
    } else if slug.is_empty() {
        errors.add("name", "The name must contain at least one letter or digit.");
    }
    slug
}

fn upload_name(config: &ImagesConfig, file_name: &str) -> String {
    format!("{}/{}", config.upload_dir.trim_end_matches('/'), file_name)
}

/// Validate a category draft's fields and transform its image.
///
/// Store-dependent checks (uniqueness) happen at commit.
pub fn prepare_category(
    images: &dyn ImageBackend,
    config: &ImagesConfig,
    draft: CategoryDraft,
    creating: bool,
) -> Result<PreparedCategory> {
    let mut errors = FieldErrors::new();
    let name = draft.name.trim().to_string();
    let summary = draft.summary.trim().to_string();
    let slug = check_name(&mut errors, &name);
    if summary.is_empty() {
        errors.add("summary", REQUIRED);
    }
    match &draft.image {
        None if creating => errors.add("image", REQUIRED),
        Some(upload) if upload.bytes.is_empty() => errors.add("image", "The submitted file is empty."),
        _ => {}
    }
    errors.into_result()?;

    let image = match draft.image {
        Some(upload) => {
            let file_name = valid_file_name(&upload.file_name);
            let mut card = create_thumbnail(images, &file_name, &upload.bytes, "", config)?;
            card.name = upload_name(config, &card.name);
            Some(card)
        }
        None => None,
    };

    Ok(PreparedCategory {
        name,
        summary,
        slug,
        image,
    })
}

/// Validate an item draft's fields and build its thumbnail.
pub fn prepare_item(
    images: &dyn ImageBackend,
    config: &ImagesConfig,
    draft: ItemDraft,
    creating: bool,
) -> Result<PreparedItem> {
    let mut errors = FieldErrors::new();
    let name = draft.name.trim().to_string();
    let summary = draft.summary.trim().to_string();
    let slug = check_name(&mut errors, &name);
    if summary.is_empty() {
        errors.add("summary", REQUIRED);
    } else if summary.chars().count() > ITEM_SUMMARY_MAX_CHARS {
        errors.add(
            "summary",
            format!("Ensure this value has at most {ITEM_SUMMARY_MAX_CHARS} characters."),
        );
    }
    if draft.content.trim().is_empty() {
        errors.add("content", REQUIRED);
    }
    match &draft.image {
        None if creating => errors.add("image", REQUIRED),
        Some(upload) if upload.bytes.is_empty() => errors.add("image", "The submitted file is empty."),
        _ => {}
    }
    errors.into_result()?;

    let image = match draft.image {
        Some(upload) => {
            let file_name = valid_file_name(&upload.file_name);
            let mut thumbnail = create_thumbnail(
                images,
                &file_name,
                &upload.bytes,
                &config.thumbnail_suffix,
                config,
            )?;
            thumbnail.name = upload_name(config, &thumbnail.name);
            let original = EncodedImage {
                name: upload_name(config, &file_name),
                content_type: content_type_for(&file_name),
                bytes: upload.bytes,
            };
            Some((original, thumbnail))
        }
        None => None,
    };

    Ok(PreparedItem {
        name,
        summary,
        content: draft.content,
        slug,
        category_id: draft.category_id,
        published_at: draft.published_at,
        image,
    })
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

fn uniqueness_errors(entity: &str, taken: &[&str]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    for field in taken {
        // A taken slug is reported on the name, which is what the user typed
        let (target, label) = match *field {
            "slug" => ("name", "slug"),
            other => (other, other),
        };
        errors.add(target, format!("{entity} with this {label} already exists."));
    }
    errors
}

/// Upload `media` in order. On failure, remove what was already stored.
async fn upload(state: &State, media: PendingMedia) -> Result<Vec<String>> {
    let mut stored = Vec::with_capacity(media.0.len());
    for image in &media.0 {
        match state
            .media
            .save(&image.name, &image.bytes, image.content_type)
            .await
        {
            Ok(name) => stored.push(name),
            Err(e) => {
                discard(state, &stored).await;
                return Err(e.into());
            }
        }
    }
    Ok(stored)
}

/// Best-effort removal of stored media.
async fn discard(state: &State, names: &[String]) {
    for name in names {
        if let Err(e) = state.media.delete(name).await {
            warn!("Failed to remove media {name}: {e}");
        }
    }
}

// =============================================================================
// Categories
// =============================================================================

/// Validate, transform and persist a category. `id` selects update.
pub async fn save_category(
    state: &State,
    id: Option<i64>,
    draft: CategoryDraft,
) -> Result<Category> {
    let images = Arc::clone(&state.images);
    let config = state.config.images.clone();
    let prepared = tokio::task::spawn_blocking(move || {
        prepare_category(images.as_ref(), &config, draft, id.is_none())
    })
    .await??;
    commit_category(state, id, prepared).await
}

pub async fn commit_category(
    state: &State,
    id: Option<i64>,
    prepared: PreparedCategory,
) -> Result<Category> {
    let (name, slug) = (prepared.name.clone(), prepared.slug.clone());
    let existing = state
        .store
        .call(move |conn| {
            let taken = categories::taken_fields(conn, &name, &slug, id)?;
            let existing = id.map(|id| categories::get(conn, id)).transpose()?;
            Ok((taken, existing))
        })
        .await?;
    let (taken, existing) = existing;
    if !taken.is_empty() {
        return Err(AppError::Validation(uniqueness_errors("Category", &taken)));
    }

    let stored = upload(state, PendingMedia(prepared.image.into_iter().collect())).await?;
    let image = match (stored.first(), &existing) {
        (Some(name), _) => name.clone(),
        (None, Some(existing)) => existing.image.clone(),
        (None, None) => return Err(AppError::bad_request("category image is required")),
    };
    let row = CategoryRow {
        name: prepared.name,
        summary: prepared.summary,
        image,
        slug: prepared.slug,
    };

    let result = state
        .store
        .call(move |conn| match id {
            Some(id) => categories::update(conn, id, &row),
            None => categories::insert(conn, &row),
        })
        .await;

    match result {
        Ok(category) => {
            if let (Some(old), false) = (&existing, stored.is_empty()) {
                discard(state, std::slice::from_ref(&old.image)).await;
            }
            info!("Saved category {} ({})", category.name, category.slug);
            Ok(category)
        }
        Err(e) => {
            discard(state, &stored).await;
            Err(e.into())
        }
    }
}

/// Delete a category; its items move to the default category.
pub async fn delete_category(state: &State, id: i64) -> Result<(Category, usize)> {
    let (category, moved) = state
        .store
        .call(move |conn| categories::delete(conn, id))
        .await?;
    discard(state, std::slice::from_ref(&category.image)).await;
    info!(
        "Deleted category {} and moved {} item(s) to the default category",
        category.name, moved
    );
    Ok((category, moved))
}

// =============================================================================
// Items
// =============================================================================

/// Validate, transform and persist an item. `id` selects update. New items
/// are announced to every account with an email address.
pub async fn save_item(state: &State, id: Option<i64>, draft: ItemDraft) -> Result<SavedItem> {
    let images = Arc::clone(&state.images);
    let config = state.config.images.clone();
    let prepared = tokio::task::spawn_blocking(move || {
        prepare_item(images.as_ref(), &config, draft, id.is_none())
    })
    .await??;
    commit_item(state, id, prepared, true).await
}

pub async fn commit_item(
    state: &State,
    id: Option<i64>,
    prepared: PreparedItem,
    announce: bool,
) -> Result<SavedItem> {
    let (name, slug) = (prepared.name.clone(), prepared.slug.clone());
    let category_id = prepared.category_id;
    let (taken, existing, category_ok) = state
        .store
        .call(move |conn| {
            let taken = items::taken_fields(conn, &name, &slug, id)?;
            let existing = id.map(|id| items::get(conn, id)).transpose()?;
            let target = category_id
                .or(existing.as_ref().map(|e| e.category_id))
                .unwrap_or(DEFAULT_CATEGORY_ID);
            let category_ok = categories::exists(conn, target)?;
            Ok((taken, existing, category_ok))
        })
        .await?;

    let mut errors = uniqueness_errors("Item", &taken);
    if !category_ok {
        errors.add("category", "Select a valid category.");
    }
    errors.into_result()?;

    let media = match prepared.image {
        Some((original, thumbnail)) => vec![original, thumbnail],
        None => Vec::new(),
    };
    let stored = upload(state, PendingMedia(media)).await?;
    let (image, image_thumbnail) = match (stored.as_slice(), &existing) {
        ([original, thumbnail], _) => (original.clone(), thumbnail.clone()),
        ([], Some(existing)) => (existing.image.clone(), existing.image_thumbnail.clone()),
        _ => return Err(AppError::bad_request("item image is required")),
    };

    let row = ItemRow {
        name: prepared.name,
        summary: prepared.summary,
        image,
        image_thumbnail,
        content: prepared.content,
        published_at: prepared
            .published_at
            .or(existing.as_ref().map(|e| e.published_at))
            .unwrap_or_else(Utc::now),
        slug: prepared.slug,
        category_id: prepared
            .category_id
            .or(existing.as_ref().map(|e| e.category_id))
            .unwrap_or(DEFAULT_CATEGORY_ID),
    };

    let result = state
        .store
        .call(move |conn| {
            let tx = conn.transaction()?;
            let item = match id {
                Some(id) => items::update(&tx, id, &row)?,
                None => items::insert(&tx, &row)?,
            };
            let category = categories::get(&tx, item.category_id)?;
            tx.commit()?;
            Ok((item, category))
        })
        .await;

    let (item, category) = match result {
        Ok(saved) => saved,
        Err(e) => {
            discard(state, &stored).await;
            return Err(e.into());
        }
    };
    if let (Some(old), false) = (&existing, stored.is_empty()) {
        discard(state, &[old.image.clone(), old.image_thumbnail.clone()]).await;
    }
    info!("Saved item {} ({})", item.name, item.slug);

    let notification = if id.is_none() && announce {
        Some(announce_item(state, &category, &item).await)
    } else {
        None
    };
    Ok(SavedItem { item, notification })
}

async fn announce_item(state: &State, category: &Category, item: &Item) -> DispatchResult {
    let recipients = match state.store.call(|conn| users::with_email(conn)).await {
        Ok(users) => users
            .into_iter()
            .map(|u| Recipient {
                username: u.username,
                email: u.email,
            })
            .collect::<Vec<_>>(),
        Err(e) => {
            warn!("Could not load notification recipients: {e}");
            Vec::new()
        }
    };
    let context = Context::from([
        ("item_name".to_string(), item.name.clone()),
        (
            "item_page_url".to_string(),
            state.absolute_url(&crate::resolve::item_path(category, item)),
        ),
        (
            "item_image_url".to_string(),
            state.absolute_url(&state.media.url(&item.image)),
        ),
    ]);
    state
        .dispatcher
        .notify(&recipients, TemplateId::NewItem, &context)
        .await
}

pub async fn delete_item(state: &State, id: i64) -> Result<Item> {
    let item = state.store.call(move |conn| items::delete(conn, id)).await?;
    discard(state, &[item.image.clone(), item.image_thumbnail.clone()]).await;
    info!("Deleted item {}", item.name);
    Ok(item)
}

pub async fn reset_views(state: &State, id: i64) -> Result<()> {
    state.store.call(move |conn| items::reset_views(conn, id)).await?;
    info!("Reset views of item {id}");
    Ok(())
}
