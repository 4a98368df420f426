//! Local filesystem media storage.
//!
//! ## Storage Layout
//!
//! ```text
//! {media_root}/
//! └── images/
//!     ├── tom-yum.png
//!     ├── tom-yum_thumbnail.jpg
//!     └── soups.jpg
//! ```

use super::{MediaError, MediaStorage, Result, candidate_names, validate_name};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Storage rooted at `root_dir`, linked as `{base_url}/{name}`.
    pub fn new(root_dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root_dir.join(name)
    }

    /// Create `path` exclusively. `Ok(false)` when it already exists.
    async fn write_new(path: &Path, bytes: &[u8]) -> Result<bool> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await;
        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(MediaError::Io(e)),
        };
        let written = async {
            file.write_all(bytes).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(path).await;
            return Err(MediaError::Io(e));
        }
        Ok(true)
    }
}

#[async_trait]
impl MediaStorage for LocalStorage {
    async fn save(&self, name: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        validate_name(name)?;
        for candidate in candidate_names(name, bytes) {
            if Self::write_new(&self.path(&candidate), bytes).await? {
                debug!("Stored {} bytes at {}", bytes.len(), candidate);
                return Ok(candidate);
            }
        }
        Err(MediaError::Exhausted(name.to_string()))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        Ok(tokio::fs::try_exists(self.path(name)).await?)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        match tokio::fs::remove_file(self.path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::Io(e)),
        }
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}
