//! High-level image operations.
//!
//! These functions combine naming and configuration with backend execution.
//! They take an [`ImagesConfig`], compute parameters, and call the backend.

use super::backend::{ImageBackend, ImagingError};
use super::params::ThumbnailParams;
use crate::config::ImagesConfig;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// A transformed image ready to hand to media storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Name of the derived file: base name up to the first `.`, then `suffix`,
/// then `.jpg`. Any directory part of `original` is dropped.
///
/// - `("tom-yum.png", "_thumbnail")` → `"tom-yum_thumbnail.jpg"`
/// - `("cake.final.webp", "")` → `"cake.jpg"`
pub fn thumbnail_name(original: &str, suffix: &str) -> String {
    let file_name = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let stem = file_name.split('.').next().unwrap_or(file_name);
    let stem = if stem.is_empty() { "image" } else { stem };
    format!("{stem}{suffix}.jpg")
}

/// Plan a thumbnail operation without executing it.
pub fn plan_thumbnail(config: &ImagesConfig) -> ThumbnailParams {
    ThumbnailParams {
        bounds: (config.thumbnail_bounds[0], config.thumbnail_bounds[1]),
        crop: (config.crop[0], config.crop[1]),
        quality: config.quality(),
    }
}

/// Run the full transform on `bytes` and name the result after `original`.
pub fn create_thumbnail(
    backend: &dyn ImageBackend,
    original: &str,
    bytes: &[u8],
    suffix: &str,
    config: &ImagesConfig,
) -> Result<EncodedImage> {
    let params = plan_thumbnail(config);
    let encoded = backend.thumbnail(bytes, &params)?;
    Ok(EncodedImage {
        name: thumbnail_name(original, suffix),
        bytes: encoded,
        content_type: JPEG_CONTENT_TYPE,
    })
}

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &dyn ImageBackend, bytes: &[u8]) -> Result<(u32, u32)> {
    let dims = backend.identify(bytes)?;
    Ok((dims.width, dims.height))
}
