//! Site configuration module.
//!
//! Handles loading and validating `tari-kitchen.toml`. Every key is optional:
//! stock defaults are merged under whatever the file specifies, then a small
//! set of deployment values may be overridden from the environment.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! site_name = "Tari Kitchen"
//! base_url = "http://localhost:8000"     # Absolute URL used in notifications
//! database_path = "tari-kitchen.sqlite3"
//! login_required_for_contact = false     # Gate /contact/ behind login
//! popular_items = 6                      # Items listed on the home page
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! session_days = 14                      # Login lifetime
//!
//! [images]
//! crop = [300, 300]                      # Exact output size
//! thumbnail_bounds = [500, 500]          # Downscale-to-fit bounds
//! quality = 90                           # JPEG quality (1-100)
//! thumbnail_suffix = "_thumbnail"
//! upload_dir = "images"                  # Prefix under media storage
//! max_upload_bytes = 10485760
//!
//! [storage]
//! backend = "local"                      # "local" or "s3"
//! static_root = "static"
//! media_root = "media"
//! # bucket = "tari-kitchen-assets"       # Required for s3
//! # region = "us-east-1"
//! media_prefix = "media"
//! # public_url = "https://cdn.example.com"
//!
//! [notifications]
//! # sns_topic_arn = "arn:aws:sns:us-east-1:123456789012:tari-kitchen"
//! # region = "us-east-1"
//! ```
//!
//! ## Environment Overrides
//!
//! | Variable | Key |
//! |---|---|
//! | `TARI_KITCHEN_DATABASE_PATH` | `database_path` |
//! | `TARI_KITCHEN_BASE_URL` | `base_url` |
//! | `TARI_KITCHEN_BIND` | `server.bind` |
//! | `TARI_KITCHEN_SNS_TOPIC_ARN` | `notifications.sns_topic_arn` |
//! | `TARI_KITCHEN_S3_BUCKET` | `storage.bucket` |
//! | `TARI_KITCHEN_AWS_REGION` | `storage.region` and `notifications.region` |
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::JpegQuality;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `tari-kitchen.toml`.
///
/// All fields have sensible defaults. Config files need only specify the
/// values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Display name shown in the header and page titles.
    pub site_name: String,
    /// Absolute site URL, without trailing slash. Used to build links in
    /// notification payloads.
    pub base_url: String,
    /// SQLite database file.
    pub database_path: String,
    /// Redirect anonymous visitors of `/contact/` to the login page.
    pub login_required_for_contact: bool,
    /// How many items the home page ranks by views.
    pub popular_items: usize,
    pub server: ServerConfig,
    pub images: ImagesConfig,
    pub storage: StorageConfig,
    pub notifications: NotificationsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: "Tari Kitchen".to_string(),
            base_url: "http://localhost:8000".to_string(),
            database_path: "tari-kitchen.sqlite3".to_string(),
            login_required_for_contact: false,
            popular_items: 6,
            server: ServerConfig::default(),
            images: ImagesConfig::default(),
            storage: StorageConfig::default(),
            notifications: NotificationsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_name.trim().is_empty() {
            return Err(ConfigError::Validation("site_name must not be empty".into()));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(
                "base_url must start with http:// or https://".into(),
            ));
        }
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "server.bind is not a socket address: {}",
                self.server.bind
            )));
        }
        if self.server.session_days == 0 {
            return Err(ConfigError::Validation("server.session_days must be at least 1".into()));
        }
        if self.images.quality == 0 || self.images.quality > 100 {
            return Err(ConfigError::Validation("images.quality must be 1-100".into()));
        }
        if self.images.crop.contains(&0) {
            return Err(ConfigError::Validation(
                "images.crop values must be non-zero".into(),
            ));
        }
        if self.images.thumbnail_bounds.contains(&0) {
            return Err(ConfigError::Validation(
                "images.thumbnail_bounds values must be non-zero".into(),
            ));
        }
        if self.images.upload_dir.is_empty() || self.images.upload_dir.starts_with('/') {
            return Err(ConfigError::Validation(
                "images.upload_dir must be a non-empty relative path".into(),
            ));
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.is_none() {
            return Err(ConfigError::Validation(
                "storage.bucket is required when storage.backend = \"s3\"".into(),
            ));
        }
        Ok(())
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// wipe a configured key.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TARI_KITCHEN_DATABASE_PATH") {
            self.database_path = v;
        }
        if let Some(v) = get("TARI_KITCHEN_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = get("TARI_KITCHEN_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = get("TARI_KITCHEN_SNS_TOPIC_ARN") {
            self.notifications.sns_topic_arn = Some(v);
        }
        if let Some(v) = get("TARI_KITCHEN_S3_BUCKET") {
            self.storage.bucket = Some(v);
        }
        if let Some(v) = get("TARI_KITCHEN_AWS_REGION") {
            self.storage.region = Some(v.clone());
            self.notifications.region = Some(v);
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    /// Days a login stays valid after it was made.
    pub session_days: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            session_days: 14,
        }
    }
}

impl ServerConfig {
    pub fn session_ttl(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.session_days))
    }
}

/// Image transform settings shared by categories and items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Exact output size as `[width, height]`.
    pub crop: [u32; 2],
    /// Bounding box for the downscale step. Sources are never upscaled.
    pub thumbnail_bounds: [u32; 2],
    /// JPEG quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Appended to the item image stem to name its thumbnail.
    pub thumbnail_suffix: String,
    /// Media prefix for uploads.
    pub upload_dir: String,
    /// Largest accepted multipart body.
    pub max_upload_bytes: usize,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            crop: [300, 300],
            thumbnail_bounds: [500, 500],
            quality: 90,
            thumbnail_suffix: "_thumbnail".to_string(),
            upload_dir: "images".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ImagesConfig {
    pub fn quality(&self) -> JpegQuality {
        JpegQuality::clamped(self.quality)
    }
}

/// Where uploaded media and static assets live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Local directory served under `/static/`.
    pub static_root: String,
    /// Local directory served under `/media/`.
    pub media_root: String,
    pub bucket: Option<String>,
    pub region: Option<String>,
    /// Key prefix for media objects in the bucket.
    pub media_prefix: String,
    /// Public base URL for bucket objects (CDN or website endpoint).
    pub public_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            static_root: "static".to_string(),
            media_root: "media".to_string(),
            bucket: None,
            region: None,
            media_prefix: "media".to_string(),
            public_url: None,
        }
    }
}

impl StorageConfig {
    /// Base URL under which page links to media objects are built.
    pub fn media_url(&self) -> String {
        match self.backend {
            StorageBackend::Local => "/media".to_string(),
            StorageBackend::S3 => format!("{}/{}", self.bucket_url(), self.media_prefix),
        }
    }

    /// Base URL for static assets.
    pub fn static_url(&self) -> String {
        match self.backend {
            StorageBackend::Local => "/static".to_string(),
            StorageBackend::S3 => format!("{}/static", self.bucket_url()),
        }
    }

    fn bucket_url(&self) -> String {
        if let Some(url) = &self.public_url {
            return url.trim_end_matches('/').to_string();
        }
        let bucket = self.bucket.as_deref().unwrap_or_default();
        match &self.region {
            Some(region) => format!("https://{bucket}.s3.{region}.amazonaws.com"),
            None => format!("https://{bucket}.s3.amazonaws.com"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationsConfig {
    /// SNS topic that receives new-item and contact notifications. When
    /// absent, dispatch reports `NotConfigured`.
    pub sns_topic_arn: Option<String>,
    pub region: Option<String>,
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Parse config text; missing keys take stock defaults.
pub fn parse_config(content: &str) -> Result<SiteConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load config from `path`, apply environment overrides and validate.
///
/// A missing file is not an error: the stock defaults are used.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let mut config = if path.exists() {
        parse_config(&fs::read_to_string(path)?)?
    } else {
        SiteConfig::default()
    };
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `tari-kitchen.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Tari Kitchen Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Display name shown in the header and page titles.
site_name = "Tari Kitchen"

# Absolute site URL used to build links in notifications.
# Env: TARI_KITCHEN_BASE_URL
base_url = "http://localhost:8000"

# SQLite database file.
# Env: TARI_KITCHEN_DATABASE_PATH
database_path = "tari-kitchen.sqlite3"

# Require a logged-in account to use the contact form.
login_required_for_contact = false

# Number of most-viewed items on the home page.
popular_items = 6

# ---------------------------------------------------------------------------
# HTTP server
# ---------------------------------------------------------------------------
[server]
# Env: TARI_KITCHEN_BIND
bind = "127.0.0.1:8000"

# Days before a login expires and the visitor must sign in again.
session_days = 14

# ---------------------------------------------------------------------------
# Image transform
# ---------------------------------------------------------------------------
[images]
# Exact output size [width, height]. Smaller fitted images are padded black.
crop = [300, 300]

# Uploads are first shrunk to fit inside these bounds (never enlarged).
thumbnail_bounds = [500, 500]

# JPEG encoding quality (1 = worst, 100 = best).
quality = 90

# Appended to the item image name for its thumbnail.
thumbnail_suffix = "_thumbnail"

# Media prefix for uploaded images.
upload_dir = "images"

# Largest accepted form upload in bytes.
max_upload_bytes = 10485760

# ---------------------------------------------------------------------------
# Static and media storage
# ---------------------------------------------------------------------------
[storage]
# "local" serves files from disk, "s3" stores media in a bucket.
backend = "local"
static_root = "static"
media_root = "media"

# Env: TARI_KITCHEN_S3_BUCKET
# bucket = "tari-kitchen-assets"
# Env: TARI_KITCHEN_AWS_REGION
# region = "us-east-1"
media_prefix = "media"
# public_url = "https://cdn.example.com"

# ---------------------------------------------------------------------------
# Notifications
# ---------------------------------------------------------------------------
[notifications]
# Env: TARI_KITCHEN_SNS_TOPIC_ARN
# sns_topic_arn = "arn:aws:sns:us-east-1:123456789012:tari-kitchen"
# region = "us-east-1"
"##
}
