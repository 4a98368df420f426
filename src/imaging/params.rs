//! What a thumbnail operation should produce.
//!
//! [`operations`](super::operations) builds a [`ThumbnailParams`] from the
//! `[images]` config; a [`backend`](super::backend) turns it into pixels.

/// JPEG encoder quality, kept within 1–100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegQuality(u8);

impl JpegQuality {
    pub const DEFAULT: JpegQuality = JpegQuality(90);

    /// Out-of-range config values are pulled to the nearest valid quality.
    pub fn clamped(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Fit the source inside `bounds` (never enlarging), then center-crop to
/// exactly `crop` and encode at `quality`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailParams {
    pub bounds: (u32, u32),
    pub crop: (u32, u32),
    pub quality: JpegQuality,
}

impl ThumbnailParams {
    pub fn crop_width(&self) -> u32 {
        self.crop.0
    }

    pub fn crop_height(&self) -> u32 {
        self.crop.1
    }
}
