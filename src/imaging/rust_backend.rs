//! Pure Rust image processing backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff + decode (JPEG, PNG, GIF, TIFF, WebP) | `image::ImageReader::with_guessed_format` |
//! | Fit within bounds | `DynamicImage::resize_exact` with `Lanczos3` at [`fit_within`] dims |
//! | Center crop | [`center_crop_box`] + `imageops::overlay` onto a black canvas |
//! | Drop alpha | `DynamicImage::to_rgb8` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder::new_with_quality` |

use super::backend::{Dimensions, ImageBackend, ImagingError};
use super::calculations::{center_crop_box, fit_within};
use super::params::ThumbnailParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, RgbImage};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, ImagingError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImagingError::UnsupportedFormat(e.to_string()))?;
    if reader.format().is_none() {
        return Err(ImagingError::UnsupportedFormat(
            "not a recognised raster format".into(),
        ));
    }
    Ok(reader)
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    reader(bytes)?
        .decode()
        .map_err(|e| ImagingError::UnsupportedFormat(format!("Failed to decode: {e}")))
}

fn encode_jpeg(canvas: &RgbImage, quality: u8) -> Result<Vec<u8>, ImagingError> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    canvas
        .write_with_encoder(encoder)
        .map_err(|e| ImagingError::Codec(format!("JPEG encode failed: {e}")))?;
    Ok(out)
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, ImagingError> {
        let (width, height) = reader(bytes)?
            .into_dimensions()
            .map_err(|e| ImagingError::UnsupportedFormat(format!("Failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn thumbnail(&self, bytes: &[u8], params: &ThumbnailParams) -> Result<Vec<u8>, ImagingError> {
        let img = decode(bytes)?;

        let (fit_w, fit_h) = fit_within((img.width(), img.height()), params.bounds);
        let fitted = if (fit_w, fit_h) == (img.width(), img.height()) {
            img
        } else {
            img.resize_exact(fit_w, fit_h, FilterType::Lanczos3)
        };
        let rgb = fitted.to_rgb8();

        // Out-of-bounds crop area stays black
        let crop = center_crop_box((fit_w, fit_h), params.crop);
        let mut canvas = RgbImage::new(params.crop_width(), params.crop_height());
        imageops::overlay(&mut canvas, &rgb, -crop.left, -crop.top);

        encode_jpeg(&canvas, params.quality.get())
    }
}
