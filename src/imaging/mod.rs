//! Image transform pipeline: fit, center crop, JPEG encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `ImageReader::into_dimensions` |
//! | **Thumbnail** | `resize_exact` (Lanczos3) + black-padded center crop + JPEG |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining naming, config and backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{Dimensions, ImageBackend, ImagingError};
pub use calculations::{CropBox, center_crop_box, fit_within};
pub use operations::{EncodedImage, create_thumbnail, get_dimensions, plan_thumbnail, thumbnail_name};
pub use params::{JpegQuality, ThumbnailParams};
pub use rust_backend::RustBackend;
