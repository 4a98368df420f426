//! Content entities and their orderings.
//!
//! These are the persisted shapes loaded by [`store`](crate::store) and
//! rendered by [`web`](crate::web). Media fields hold storage names
//! (`images/tom-yum_thumbnail.jpg`), never URLs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

/// Id of the category items fall back to when theirs is deleted.
pub const DEFAULT_CATEGORY_ID: i64 = 1;

/// Longest accepted item summary, in characters.
pub const ITEM_SUMMARY_MAX_CHARS: usize = 200;

/// Longest accepted contact message, in characters.
pub const CONTACT_MESSAGE_MAX_CHARS: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub summary: String,
    pub image: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub summary: String,
    pub image: String,
    pub image_thumbnail: String,
    /// Markdown body.
    pub content: String,
    pub published_at: DateTime<Utc>,
    pub slug: String,
    pub category_id: i64,
    pub views: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

/// An uploaded file as received from a form or read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Category fields as submitted, before validation.
#[derive(Debug, Clone, Default)]
pub struct CategoryDraft {
    pub name: String,
    pub summary: String,
    /// Required on create; `None` on edit keeps the current image.
    pub image: Option<Upload>,
}

/// Item fields as submitted, before validation.
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub name: String,
    pub summary: String,
    pub content: String,
    /// `None` selects the default category.
    pub category_id: Option<i64>,
    /// `None` means "now" on create and "unchanged" on edit.
    pub published_at: Option<DateTime<Utc>>,
    pub image: Option<Upload>,
}

/// Entities ordered and addressed by display name.
pub trait Named {
    fn id(&self) -> i64;
    fn name(&self) -> &str;
}

impl Named for Category {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Item {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Ascending by name, ties broken by id so the order is total.
pub fn by_name<T: Named>(a: &T, b: &T) -> Ordering {
    a.name().cmp(b.name()).then(a.id().cmp(&b.id()))
}

/// Most viewed first; equal counts fall back to [`by_name`].
pub fn by_views_desc(a: &Item, b: &Item) -> Ordering {
    b.views.cmp(&a.views).then_with(|| by_name(a, b))
}
