//! Media storage for uploaded and derived images.
//!
//! Entities store media *names* (`images/pho_thumbnail.jpg`); a
//! [`MediaStorage`] turns names into bytes at rest and into public URLs.
//! The backend is chosen once at boot from `[storage] backend`:
//!
//! - [`LocalStorage`]: files under `media_root`, served by the app at `/media/`
//! - [`S3Storage`]: public-read objects under `{media_prefix}/` in a bucket
//!
//! Saving never overwrites. When a name is taken the file is stored under an
//! alternative (see [`candidate_names`]) and the name actually used is
//! returned.

pub mod local;
pub mod s3;

use crate::config::{StorageBackend, StorageConfig};
use async_trait::async_trait;
use data_encoding::HEXLOWER;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

pub use local::LocalStorage;
pub use s3::S3Storage;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object storage error: {0}")]
    Remote(String),
    #[error("Invalid media name: {0}")]
    InvalidName(String),
    #[error("No free name for {0}")]
    Exhausted(String),
}

pub type Result<T> = std::result::Result<T, MediaError>;

/// How many alternative names are tried before giving up.
const MAX_CANDIDATES: usize = 100;

#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Store `bytes` under `name` or, if taken, under the first free
    /// alternative. Returns the name used.
    async fn save(&self, name: &str, bytes: &[u8], content_type: &str) -> Result<String>;

    async fn exists(&self, name: &str) -> Result<bool>;

    /// Remove a stored file. Missing files are not an error.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Public URL for a stored name.
    fn url(&self, name: &str) -> String;
}

/// Build the configured backend.
pub async fn from_config(config: &StorageConfig) -> Result<Arc<dyn MediaStorage>> {
    match config.backend {
        StorageBackend::Local => Ok(Arc::new(LocalStorage::new(
            &config.media_root,
            config.media_url(),
        ))),
        StorageBackend::S3 => Ok(Arc::new(S3Storage::from_config(config).await?)),
    }
}

/// Reject names that could escape the media root.
pub fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(MediaError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Reduce an uploaded file name to a safe storage name: directory parts are
/// dropped, spaces become `_`, anything but ASCII letters, digits, `.`, `-`
/// and `_` is removed.
pub fn valid_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            _ => None,
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Names to try, in order: `name` itself, then `stem_<hash>.ext` with the
/// first 7 hex digits of the content hash, then `stem_<hash>_<n>.ext`.
pub fn candidate_names(name: &str, bytes: &[u8]) -> impl Iterator<Item = String> {
    let (dir, file) = match name.rsplit_once('/') {
        Some((dir, file)) => (format!("{dir}/"), file.to_string()),
        None => (String::new(), name.to_string()),
    };
    let (stem, ext) = match file.split_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{ext}")),
        None => (file.clone(), String::new()),
    };
    let digest = HEXLOWER.encode(&Sha256::digest(bytes));
    let short = digest[..7].to_string();
    let original = name.to_string();

    std::iter::once(original)
        .chain(std::iter::once(format!("{dir}{stem}_{short}{ext}")))
        .chain((2..).map(move |n| format!("{dir}{stem}_{short}_{n}{ext}")))
        .take(MAX_CANDIDATES)
}
