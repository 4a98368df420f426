//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the site needs from a
//! pixel library: identify (read dimensions) and thumbnail (fit, crop, encode).
//! Both work on in-memory bytes because uploads arrive as multipart bodies and
//! results go to pluggable media storage, not to local paths.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::ThumbnailParams;
use thiserror::Error;

/// Failures of the transform pipeline. Both abort the entity save.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImagingError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Image codec error: {0}")]
    Codec(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
pub trait ImageBackend: Send + Sync {
    /// Decode just enough of `bytes` to report dimensions.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, ImagingError>;

    /// Fit within bounds, center-crop to the exact crop size, drop alpha and
    /// encode as JPEG. Returns the encoded bytes.
    fn thumbnail(&self, bytes: &[u8], params: &ThumbnailParams) -> Result<Vec<u8>, ImagingError>;
}
