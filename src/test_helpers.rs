//! Shared test utilities for the tari-kitchen test suite.
//!
//! Provides entity fixtures, in-memory image bytes, and [`TestSite`]: a
//! fully wired [`State`] over an in-memory database, a temporary media
//! directory, the real image backend and (optionally) a recording
//! notification transport.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = TestSite::with_transport().await;
//! site.user("ana", "ana@example.com").await;
//! let soups = site.category("Soups").await;
//! let laksa = site.item("Laksa", &soups).await;
//!
//! assert!(site.media_file(&laksa.image_thumbnail).exists());
//! assert_eq!(site.published().len(), 1);
//! ```

use chrono::{TimeZone, Utc};
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use crate::config::SiteConfig;
use crate::content;
use crate::imaging::RustBackend;
use crate::media::LocalStorage;
use crate::models::{Category, CategoryDraft, Item, ItemDraft, Upload, User};
use crate::notify::Dispatcher;
use crate::notify::tests::RecordingTransport;
use crate::slug::slugify;
use crate::state::{AppState, State};
use crate::store::{Store, users};

// =========================================================================
// Entity fixtures
// =========================================================================

pub fn category_fixture(id: i64, name: &str) -> Category {
    Category {
        id,
        name: name.to_string(),
        summary: format!("All about {name}"),
        image: format!("images/{}.jpg", slugify(name)),
        slug: slugify(name),
    }
}

pub fn item_fixture(id: i64, name: &str, category_id: i64) -> Item {
    let slug = slugify(name);
    Item {
        id,
        name: name.to_string(),
        summary: format!("{name} in short"),
        image: format!("images/{slug}.png"),
        image_thumbnail: format!("images/{slug}_thumbnail.jpg"),
        content: format!("# {name}\n\nCook it well."),
        published_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        slug,
        category_id,
        views: 0,
    }
}

/// A solid-colour PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, image::Rgba([200, 120, 40, 255]));
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    out
}

// =========================================================================
// Wired site
// =========================================================================

pub struct TestSite {
    pub state: AppState,
    media_dir: TempDir,
    transport: Option<Arc<RecordingTransport>>,
}

impl TestSite {
    /// Site without a notification transport.
    pub async fn new() -> Self {
        Self::build(SiteConfig::default(), false)
    }

    /// Site whose notifications are recorded.
    pub async fn with_transport() -> Self {
        Self::build(SiteConfig::default(), true)
    }

    fn build(config: SiteConfig, with_transport: bool) -> Self {
        let media_dir = TempDir::new().unwrap();
        let store = Store::open_in_memory().unwrap();
        let media = Arc::new(LocalStorage::new(media_dir.path(), "/media"));
        let transport = with_transport.then(|| Arc::new(RecordingTransport::default()));
        let dispatcher = Dispatcher::new(
            transport
                .clone()
                .map(|t| t as Arc<dyn crate::notify::Transport>),
            config.base_url.clone(),
        );
        let state = State::from_parts(config, store, media, Arc::new(RustBackend::new()), dispatcher);
        Self {
            state,
            media_dir,
            transport,
        }
    }

    /// Path on disk of a stored media name.
    pub fn media_file(&self, name: &str) -> PathBuf {
        self.media_dir.path().join(name)
    }

    /// Everything published so far. Panics if the site has no transport.
    pub fn published(&self) -> Vec<Value> {
        self.transport
            .as_ref()
            .unwrap_or_else(|| panic!("site was built without a recording transport"))
            .published()
    }

    /// Create a category with a generated cover image.
    pub async fn category(&self, name: &str) -> Category {
        let draft = CategoryDraft {
            name: name.to_string(),
            summary: format!("All about {name}"),
            image: Some(Upload {
                file_name: format!("{}.png", slugify(name)),
                bytes: png_bytes(640, 480),
            }),
        };
        content::save_category(&self.state, None, draft)
            .await
            .unwrap_or_else(|e| panic!("category '{name}' not saved: {e}"))
    }

    /// Create an item in `category` with a generated image.
    pub async fn item(&self, name: &str, category: &Category) -> Item {
        let draft = ItemDraft {
            name: name.to_string(),
            summary: format!("{name} in short"),
            content: format!("# {name}\n\nCook it well."),
            category_id: Some(category.id),
            published_at: None,
            image: Some(Upload {
                file_name: format!("{}.png", slugify(name)),
                bytes: png_bytes(640, 480),
            }),
        };
        content::save_item(&self.state, None, draft)
            .await
            .unwrap_or_else(|e| panic!("item '{name}' not saved: {e}"))
            .item
    }

    /// Create an account with a cheap password hash.
    pub async fn user(&self, username: &str, email: &str) -> User {
        let hash = crate::auth::hash_password_with("password123", 1_000).unwrap();
        let (username, email) = (username.to_string(), email.to_string());
        self.state
            .store
            .call(move |conn| users::create(conn, &username, &email, &hash, false))
            .await
            .unwrap()
    }
}
